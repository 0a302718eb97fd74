use std::sync::Arc;

use pathtrack_core::geometry::Twist;
use pathtrack_core::lifecycle::ActivationGate;

use crate::interfaces::VelocitySink;

/// Velocity output gated on the lifecycle.
///
/// Commands are dropped while the node is not Active, which is what makes
/// "no command outside Active" hold regardless of what the loop does. The
/// gate flips off only after `on_deactivate` returns, so the loop's final
/// zero command still goes out.
#[derive(Clone)]
pub struct CommandPublisher {
    sink: Arc<dyn VelocitySink>,
    gate: Arc<ActivationGate>,
}

impl CommandPublisher {
    pub fn new(sink: Arc<dyn VelocitySink>, gate: Arc<ActivationGate>) -> Self {
        Self { sink, gate }
    }

    pub fn publish(&self, command: Twist) {
        if self.gate.is_active() {
            self.sink.send(command);
        }
    }

    pub fn publish_zero(&self) {
        self.publish(Twist::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<Twist>>);

    impl VelocitySink for Recorder {
        fn send(&self, command: Twist) {
            self.0.lock().unwrap().push(command);
        }
    }

    #[test]
    fn drops_commands_while_gate_is_off() {
        let sink = Arc::new(Recorder(Mutex::new(Vec::new())));
        let gate = Arc::new(ActivationGate::new());
        let publisher = CommandPublisher::new(sink.clone(), gate.clone());

        publisher.publish(Twist {
            linear_x: 1.0,
            ..Twist::ZERO
        });
        assert!(sink.0.lock().unwrap().is_empty());

        gate.activate();
        publisher.publish_zero();
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[Twist::ZERO]);

        gate.deactivate();
        publisher.publish_zero();
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }
}
