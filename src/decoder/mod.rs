pub mod http;
pub mod throttle;
pub mod upstream;
pub mod url_decoder;

pub use http::HttpDecodeUpstream;
pub use throttle::Throttle;
pub use upstream::DecodeUpstream;
pub use url_decoder::UrlDecoder;
