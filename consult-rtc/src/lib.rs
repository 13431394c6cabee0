mod call;
mod media;
mod signaling;
mod transport;

pub use call::*;
pub use media::*;
pub use signaling::*;
pub use transport::*;
