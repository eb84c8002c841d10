use core::cell::RefCell;

use critical_section::Mutex;

use embedded_hal::digital::{OutputPin, PinState};

use crate::trigger::TriggerState;

/// An output which mirrors the [`TriggerState`].
pub trait Indicator {
    /// Drives the output to the level representing `state`.
    ///
    /// It must complete in bounded time, since it is also called from
    /// interrupt context.
    fn show(&mut self, state: TriggerState);
}

/// A LED driven by a digital output pin.
pub struct Led<P: OutputPin> {
    pin: P,
    active: PinState,
}

impl<P: OutputPin> Led<P> {
    /// Creates a [`Led`] which is lit when its pin is high.
    #[must_use]
    pub const fn active_high(pin: P) -> Self {
        Self {
            pin,
            active: PinState::High,
        }
    }

    /// Creates a [`Led`] which is lit when its pin is low.
    ///
    /// This is the wiring of the built-in LED on most `ESP32-C3` boards.
    #[must_use]
    pub const fn active_low(pin: P) -> Self {
        Self {
            pin,
            active: PinState::Low,
        }
    }

    /// Releases the underlying pin.
    #[must_use]
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> Indicator for Led<P> {
    fn show(&mut self, state: TriggerState) {
        let level = if state.is_triggered() {
            self.active
        } else {
            !self.active
        };
        // A pin error cannot be reported from interrupt context, and the
        // next transition rewrites the level anyway.
        let _ = self.pin.set_state(level);
    }
}

/// An [`Indicator`] shared between interrupt context and tasks.
///
/// Every access happens inside a critical section, which is the only kind
/// of exclusion usable from an interrupt handler. The indicator is absent
/// until [`SharedIndicator::install`] is called, so a [`SharedIndicator`]
/// can live in a `static`.
pub struct SharedIndicator<I: Indicator>(Mutex<RefCell<Option<I>>>);

impl<I: Indicator> Default for SharedIndicator<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Indicator> SharedIndicator<I> {
    /// Creates an empty [`SharedIndicator`].
    #[must_use]
    pub const fn new() -> Self {
        Self(Mutex::new(RefCell::new(None)))
    }

    /// Installs the indicator, returning the previous one, if any.
    pub fn install(&self, indicator: I) -> Option<I> {
        critical_section::with(|cs| self.0.borrow_ref_mut(cs).replace(indicator))
    }

    /// Removes the indicator.
    pub fn take(&self) -> Option<I> {
        critical_section::with(|cs| self.0.borrow_ref_mut(cs).take())
    }

    /// Shows `state` on the installed indicator.
    ///
    /// Nothing happens when no indicator is installed.
    pub fn show(&self, state: TriggerState) {
        critical_section::with(|cs| {
            if let Some(indicator) = self.0.borrow_ref_mut(cs).as_mut() {
                indicator.show(state);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    use crate::trigger::TriggerState;

    use super::{Indicator, Led, SharedIndicator};

    #[test]
    fn active_high_led() {
        let expectations = [
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
        ];

        let mut led = Led::active_high(PinMock::new(&expectations));
        led.show(TriggerState::Triggered);
        led.show(TriggerState::Untriggered);

        led.release().done();
    }

    #[test]
    fn active_low_led() {
        let expectations = [
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];

        let mut led = Led::active_low(PinMock::new(&expectations));
        led.show(TriggerState::Triggered);
        led.show(TriggerState::Untriggered);

        led.release().done();
    }

    #[test]
    fn shared_without_indicator() {
        let shared = SharedIndicator::<Led<PinMock>>::new();

        // No indicator installed, so nothing is driven.
        shared.show(TriggerState::Triggered);

        assert!(shared.take().is_none());
    }

    #[test]
    fn shared_led() {
        let expectations = [PinTransaction::set(State::Low)];

        let shared = SharedIndicator::new();
        assert!(shared.install(Led::active_low(PinMock::new(&expectations))).is_none());

        shared.show(TriggerState::Triggered);

        let mut pin = shared.take().map(Led::release).unwrap();
        pin.done();
    }
}
