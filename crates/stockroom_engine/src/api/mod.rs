// The api module exposes the engine's functionality as an HTTP service.
// ApiService implements the HttpService trait from stockroom_base, so it
// runs unchanged under RealPal (production) and MockPal (tests).

mod service;

pub use service::ApiService;
