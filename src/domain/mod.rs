// Domain layer - Core types and chart logic
pub mod channel;
pub mod sensor;
