use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{error, info};

use pathtrack_core::error::{CoreError, Domain, ErrorKind, Result};
use pathtrack_core::geometry::Pose2D;
use pathtrack_core::lifecycle::{
    drive, ActivationGate, CallbackResult, LifecycleCallbacks, LifecycleState, Transition,
};

use crate::config::ControllerConfig;
use crate::costmap::CostmapService;
use crate::events::TransitionEvent;
use crate::executor::{GoalExecutor, GoalHandle, Progress};
use crate::interfaces::{CostmapSource, RobotStateSource, TrajectoryOptimizer, VelocitySink};
use crate::publisher::CommandPublisher;

/// Lifecycle shell around a set of callbacks.
///
/// Responsibilities:
/// - hold the current lifecycle state
/// - run transitions through the core engine
/// - flip the activation gate when entering/leaving Active, after the
///   callback has finished
/// - emit a transition event after each applied transition
pub struct LifecycleNode {
    name: String,
    state: LifecycleState,
    gate: Arc<ActivationGate>,
    callbacks: Box<dyn LifecycleCallbacks + Send>,
    transition_events: broadcast::Sender<TransitionEvent>,
}

impl std::fmt::Debug for LifecycleNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleNode")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LifecycleNode {
    /// The gate is passed in because the callbacks usually share it.
    /// Starts in Unconfigured with the gate off.
    pub fn new(
        name: impl Into<String>,
        gate: Arc<ActivationGate>,
        callbacks: Box<dyn LifecycleCallbacks + Send>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::error()
                .domain(Domain::Lifecycle)
                .kind(ErrorKind::InvalidArgument)
                .msg("node name must not be empty")
                .build());
        }

        let (transition_events, _) = broadcast::channel(32);

        Ok(Self {
            name,
            state: LifecycleState::Unconfigured,
            gate,
            callbacks,
            transition_events,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activation_gate(&self) -> Arc<ActivationGate> {
        Arc::clone(&self.gate)
    }

    pub fn subscribe_transition_events(&self) -> broadcast::Receiver<TransitionEvent> {
        self.transition_events.subscribe()
    }

    /// Apply one externally requested transition.
    ///
    /// Returns `(intermediate_state, final_state)`. Refused edges leave the
    /// state untouched.
    pub fn request_transition(
        &mut self,
        via: Transition,
    ) -> Result<(LifecycleState, LifecycleState)> {
        let start = self.state;
        let (intermediate, final_state) = drive(start, via, self.callbacks.as_mut())?;

        // Gate policy: on when a transition lands in Active, off when one
        // leaves it. Runs after the callback so a final zero command
        // published inside on_deactivate still went through.
        match (start, final_state) {
            (_, LifecycleState::Active) => self.gate.activate(),
            (LifecycleState::Active, _) => self.gate.deactivate(),
            _ => {}
        }

        self.state = final_state;
        info!(node = %self.name, %via, from = %start, to = %final_state, "lifecycle transition");

        let _ = self.transition_events.send(TransitionEvent {
            transition: via,
            start_state: start,
            goal_state: final_state,
        });

        Ok((intermediate, final_state))
    }
}

/// External collaborators injected into the controller.
pub struct ControllerDeps {
    pub optimizer: Box<dyn TrajectoryOptimizer>,
    pub costmap: Arc<dyn CostmapSource>,
    pub robot_state: Arc<dyn RobotStateSource>,
    pub velocity: Arc<dyn VelocitySink>,
}

/// Resources that exist between on_configure and on_cleanup.
struct Configured {
    costmap: CostmapService,
    publisher: CommandPublisher,
}

/// Lifecycle callbacks wiring the controller together.
///
/// on_configure allocates, on_activate starts background work, on_deactivate
/// stops it (final zero command included), on_cleanup releases, and
/// on_shutdown/on_error release best-effort from whatever state.
struct FollowerCallbacks {
    config: ControllerConfig,
    gate: Arc<ActivationGate>,
    runtime: tokio::runtime::Handle,
    executor: GoalExecutor,
    optimizer: Arc<Mutex<Box<dyn TrajectoryOptimizer>>>,
    costmap_source: Arc<dyn CostmapSource>,
    robot_state: Arc<dyn RobotStateSource>,
    velocity_sink: Arc<dyn VelocitySink>,
    configured: Option<Configured>,
}

impl FollowerCallbacks {
    fn release_everything(&mut self) {
        self.executor.halt();
        if let Some(mut configured) = self.configured.take() {
            configured.publisher.publish_zero();
            configured.costmap.stop();
        }
    }
}

impl LifecycleCallbacks for FollowerCallbacks {
    fn on_configure(&mut self) -> CallbackResult {
        if let Err(err) = self.config.validate() {
            error!("configure failed: {err}");
            return CallbackResult::Failure;
        }

        let costmap = CostmapService::new(
            Arc::clone(&self.costmap_source),
            self.config.costmap_refresh_period,
            self.runtime.clone(),
        );
        let publisher = CommandPublisher::new(Arc::clone(&self.velocity_sink), Arc::clone(&self.gate));

        self.configured = Some(Configured { costmap, publisher });
        CallbackResult::Success
    }

    fn on_activate(&mut self) -> CallbackResult {
        let Some(configured) = self.configured.as_mut() else {
            error!("activate without configured resources");
            return CallbackResult::Error;
        };

        configured.costmap.start();
        self.executor.start(crate::control_loop::LoopContext {
            config: self.config.clone(),
            optimizer: Arc::clone(&self.optimizer),
            robot_state: Arc::clone(&self.robot_state),
            costmap: configured.costmap.subscribe(),
            publisher: configured.publisher.clone(),
            feedback: self.executor.feedback_sender(),
        });
        CallbackResult::Success
    }

    fn on_deactivate(&mut self) -> CallbackResult {
        // Halt first: the loop closes out any goal and publishes the final
        // zero command while the gate is still on.
        self.executor.halt();
        if let Some(configured) = self.configured.as_mut() {
            // One more zero, unconditionally: covers a goal-less
            // deactivation and a halt that had to force-abort the loop.
            configured.publisher.publish_zero();
            configured.costmap.stop();
        }
        CallbackResult::Success
    }

    fn on_cleanup(&mut self) -> CallbackResult {
        self.configured = None;
        CallbackResult::Success
    }

    fn on_shutdown(&mut self) -> CallbackResult {
        self.release_everything();
        CallbackResult::Success
    }

    fn on_error(&mut self) -> CallbackResult {
        self.release_everything();
        CallbackResult::Success
    }
}

/// The path-following controller node.
///
/// Couples the lifecycle shell with the goal executor: goals are accepted
/// only in Active, a deactivation cancels the running goal and forces a
/// final zero command, and every outcome is delivered exactly once.
pub struct PathFollower {
    node: LifecycleNode,
    executor: GoalExecutor,
}

impl PathFollower {
    /// Build the controller. Must run inside a tokio runtime; background
    /// tasks are spawned on it during activation.
    pub fn new(
        name: impl Into<String>,
        config: ControllerConfig,
        deps: ControllerDeps,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            CoreError::error()
                .domain(Domain::Lifecycle)
                .kind(ErrorKind::InvalidState)
                .msg("PathFollower must be created inside a tokio runtime")
                .build()
        })?;

        let gate = Arc::new(ActivationGate::new());
        let executor = GoalExecutor::new(config.clone(), Arc::clone(&gate), runtime.clone());

        let callbacks = FollowerCallbacks {
            config,
            gate: Arc::clone(&gate),
            runtime,
            executor: executor.clone(),
            optimizer: Arc::new(Mutex::new(deps.optimizer)),
            costmap_source: deps.costmap,
            robot_state: deps.robot_state,
            velocity_sink: deps.velocity,
            configured: None,
        };

        let node = LifecycleNode::new(name, gate, Box::new(callbacks))?;
        Ok(Self { node, executor })
    }

    pub fn state(&self) -> LifecycleState {
        self.node.state()
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn subscribe_transition_events(&self) -> broadcast::Receiver<TransitionEvent> {
        self.node.subscribe_transition_events()
    }

    /// Lifecycle control surface. Deactivate and shutdown block the caller
    /// for up to `halt_wait`; drive them off the async workers.
    pub fn request_transition(
        &mut self,
        via: Transition,
    ) -> Result<(LifecycleState, LifecycleState)> {
        self.node.request_transition(via)
    }

    pub fn configure(&mut self) -> Result<LifecycleState> {
        self.request_transition(Transition::Configure).map(|(_, s)| s)
    }

    pub fn activate(&mut self) -> Result<LifecycleState> {
        self.request_transition(Transition::Activate).map(|(_, s)| s)
    }

    pub fn deactivate(&mut self) -> Result<LifecycleState> {
        self.request_transition(Transition::Deactivate).map(|(_, s)| s)
    }

    pub fn cleanup(&mut self) -> Result<LifecycleState> {
        self.request_transition(Transition::Cleanup).map(|(_, s)| s)
    }

    pub fn shutdown(&mut self) -> Result<LifecycleState> {
        self.request_transition(Transition::Shutdown).map(|(_, s)| s)
    }

    /// Submit a follow-path goal. See [`GoalExecutor::submit`].
    pub fn follow_path(&self, poses: Vec<Pose2D>) -> Result<GoalHandle> {
        self.executor.submit(poses)
    }

    /// Cancel the running goal, observed at the next tick boundary.
    pub fn cancel(&self) -> Result<()> {
        self.executor.cancel()
    }

    /// Progress feedback across all goals, tagged by goal id.
    pub fn subscribe_feedback(&self) -> broadcast::Receiver<Progress> {
        self.executor.subscribe_feedback()
    }

    /// Refine the running goal's path without restarting the goal.
    pub fn update_path(&self, poses: Vec<Pose2D>) -> Result<()> {
        self.executor.update_path(poses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopCallbacks;

    impl LifecycleCallbacks for NoopCallbacks {
        fn on_configure(&mut self) -> CallbackResult {
            CallbackResult::Success
        }
        fn on_activate(&mut self) -> CallbackResult {
            CallbackResult::Success
        }
        fn on_deactivate(&mut self) -> CallbackResult {
            CallbackResult::Success
        }
        fn on_cleanup(&mut self) -> CallbackResult {
            CallbackResult::Success
        }
        fn on_shutdown(&mut self) -> CallbackResult {
            CallbackResult::Success
        }
        fn on_error(&mut self) -> CallbackResult {
            CallbackResult::Success
        }
    }

    fn node() -> LifecycleNode {
        LifecycleNode::new(
            "test_follower",
            Arc::new(ActivationGate::new()),
            Box::new(NoopCallbacks),
        )
        .unwrap()
    }

    #[test]
    fn empty_name_is_refused() {
        let err = LifecycleNode::new("", Arc::new(ActivationGate::new()), Box::new(NoopCallbacks))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn gate_follows_the_active_state() {
        let mut node = node();
        let gate = node.activation_gate();

        node.request_transition(Transition::Configure).unwrap();
        assert!(!gate.is_active());

        node.request_transition(Transition::Activate).unwrap();
        assert!(gate.is_active());

        node.request_transition(Transition::Deactivate).unwrap();
        assert!(!gate.is_active());
    }

    #[test]
    fn transition_event_emitted_after_success() {
        let mut node = node();
        let mut rx = node.subscribe_transition_events();

        node.request_transition(Transition::Configure).unwrap();

        let event = rx.try_recv().expect("expected a transition event");
        assert_eq!(event.transition, Transition::Configure);
        assert_eq!(event.start_state, LifecycleState::Unconfigured);
        assert_eq!(event.goal_state, LifecycleState::Inactive);
    }

    #[test]
    fn refused_edge_leaves_state_untouched() {
        let mut node = node();
        assert!(node.request_transition(Transition::Activate).is_err());
        assert_eq!(node.state(), LifecycleState::Unconfigured);
    }
}
