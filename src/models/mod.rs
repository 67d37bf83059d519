pub mod dish;
pub mod request;
pub mod stream;
pub mod upload;

pub use dish::*;
pub use request::*;
pub use stream::*;
pub use upload::*;
