use core::cell::RefCell;

use critical_section::Mutex;

use esp_hal::gpio::{Event, Input, Io, Output};
use esp_hal::{handler, ram};

use doormon::detector::EdgeDetector;
use doormon::indicator::{Led, SharedIndicator};
use doormon::trigger::{TriggerLatch, TriggerState};

use log::info;

/// The indicator LED.
pub type BoardIndicator = Led<Output<'static>>;

// The trigger flag, written by the interrupt handler.
static LATCH: TriggerLatch = TriggerLatch::new();
// The indicator LED, driven both by the interrupt handler and by tasks.
static INDICATOR: SharedIndicator<BoardIndicator> = SharedIndicator::new();
// The monitored input line, whose interrupt status is cleared by the handler.
static TRIGGER_INPUT: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

/// The trigger latch.
#[must_use]
pub fn latch() -> &'static TriggerLatch {
    &LATCH
}

/// The indicator LED mirroring the trigger latch.
#[must_use]
pub fn indicator() -> &'static SharedIndicator<BoardIndicator> {
    &INDICATOR
}

#[inline]
fn detector() -> EdgeDetector<'static, BoardIndicator> {
    EdgeDetector::new(&LATCH, &INDICATOR)
}

#[handler]
#[ram]
fn on_falling_edge() {
    let pending = critical_section::with(|cs| {
        TRIGGER_INPUT
            .borrow_ref_mut(cs)
            .as_mut()
            .is_some_and(|input| {
                let pending = input.is_interrupt_set();
                if pending {
                    input.clear_interrupt();
                }
                pending
            })
    });

    if pending {
        let _ = detector().on_falling_edge();
    }
}

/// The falling-edge trigger of the board.
pub struct EdgeTrigger;

impl EdgeTrigger {
    /// Installs the indicator LED and lights it according to the restored
    /// trigger state.
    pub fn init(led: BoardIndicator) -> TriggerState {
        let _ = INDICATOR.install(led);
        let state = detector().init();
        info!("Indicator initialized as {state}");
        state
    }

    /// Arms the falling-edge interrupt on `input`.
    pub fn arm(io: &mut Io<'_>, mut input: Input<'static>) {
        io.set_interrupt_handler(on_falling_edge);

        critical_section::with(|cs| {
            input.listen(Event::FallingEdge);
            let _ = TRIGGER_INPUT.borrow_ref_mut(cs).replace(input);
        });

        info!("Falling-edge trigger armed");
    }
}
