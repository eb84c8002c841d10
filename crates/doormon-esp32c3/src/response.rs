use edge_http::io::Error;
use edge_http::io::server::Connection;

use embedded_io_async::{Read, Write};

use doormon::response::Reply;

/// Writes `reply` on `conn`.
#[inline]
pub(crate) async fn write_reply<T, const N: usize>(
    reply: &Reply,
    conn: &mut Connection<'_, T, N>,
) -> Result<(), Error<T::Error>>
where
    T: Read + Write,
{
    conn.initiate_response(reply.status(), Some(reply.message()), reply.headers())
        .await?;

    conn.write_all(reply.body()).await
}
