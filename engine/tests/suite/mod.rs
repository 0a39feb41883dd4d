// Aggregates all former standalone integration tests as modules.
mod harness;
mod lifecycle;
mod pipeline_flow;
mod scans;
