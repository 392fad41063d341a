mod channel;
mod error;
mod helpers;
mod relay;
mod session_client;
