mod metrics;
mod runtime;
