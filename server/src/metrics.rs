use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

/// Process-wide counters exposed on `/metrics`.
pub struct Metrics {
    registry: Registry,
    pub connections: Counter,
    pub commands: Counter,
    pub rejected_commands: Counter,
    pub rounds_settled: Counter,
    pub participants: Gauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("yieldroom");
        let connections = Counter::default();
        let commands = Counter::default();
        let rejected_commands = Counter::default();
        let rounds_settled = Counter::default();
        let participants = Gauge::default();
        registry.register(
            "connections",
            "WebSocket connections accepted",
            connections.clone(),
        );
        registry.register("commands", "Commands handled", commands.clone());
        registry.register(
            "rejected_commands",
            "Frames that could not be parsed into a command",
            rejected_commands.clone(),
        );
        registry.register("rounds_settled", "Rounds settled", rounds_settled.clone());
        registry.register(
            "participants",
            "Participants currently registered",
            participants.clone(),
        );

        Self {
            registry,
            connections,
            commands,
            rejected_commands,
            rounds_settled,
            participants,
        }
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
