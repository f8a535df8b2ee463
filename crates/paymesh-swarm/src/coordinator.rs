// Agent registry, dispatcher, consensus, and failure recovery

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use paymesh_common::{Clock, IdGenerator};

use crate::{
    Agent, AgentHandler, AgentRole, AgentStatus, ConsensusResult, SwarmConfig, SwarmError,
    SwarmStatus, SwarmTask, TaskKind, TaskQueue, TaskStatus, Vote,
};

#[derive(Debug, Default, Clone, Copy)]
struct SwarmCounters {
    completed: u64,
    failed: u64,
}

/// Coordinator for a pool of specialized agents.
///
/// Each shared structure sits behind its own mutex and locks are never
/// nested; the dispatcher acquires them one at a time. Handler execution
/// runs on spawned tasks, one per busy agent, so parallelism is bounded by
/// the agent count structurally.
pub struct SwarmCoordinator {
    config: SwarmConfig,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    handler: Arc<dyn AgentHandler>,
    agents: Mutex<HashMap<String, Agent>>,
    tasks: Mutex<HashMap<String, SwarmTask>>,
    queue: Mutex<TaskQueue>,
    counters: Mutex<SwarmCounters>,
    shut_down: AtomicBool,
    task_done: Notify,
    /// Back-reference so dispatch and recovery can spawn with an owned Arc.
    self_ref: Weak<SwarmCoordinator>,
}

impl SwarmCoordinator {
    pub fn new(
        config: SwarmConfig,
        clock: Arc<dyn Clock>,
        handler: Arc<dyn AgentHandler>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            config,
            clock,
            ids: IdGenerator::new(),
            handler,
            agents: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            queue: Mutex::new(TaskQueue::new()),
            counters: Mutex::new(SwarmCounters::default()),
            shut_down: AtomicBool::new(false),
            task_done: Notify::new(),
            self_ref: self_ref.clone(),
        })
    }

    /// Register one agent. Agents join active and are never removed; only
    /// their status changes.
    pub fn add_agent(
        &self,
        role: AgentRole,
        voting_weight: f64,
        capabilities: Vec<String>,
    ) -> String {
        let id = self.ids.new_id("agent");
        let agent = Agent {
            id: id.clone(),
            role,
            capabilities,
            voting_weight: voting_weight.max(0.0),
            status: AgentStatus::Active,
            last_active: self.clock.now(),
        };
        self.agents
            .lock()
            .expect("agents mutex poisoned")
            .insert(id.clone(), agent);
        info!(agent_id = %id, role = ?role, voting_weight, "Agent registered");
        id
    }

    pub fn agent(&self, agent_id: &str) -> Option<Agent> {
        self.agents
            .lock()
            .expect("agents mutex poisoned")
            .get(agent_id)
            .cloned()
    }

    pub fn agents_snapshot(&self) -> Vec<Agent> {
        self.agents
            .lock()
            .expect("agents mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn task(&self, task_id: &str) -> Option<SwarmTask> {
        self.tasks
            .lock()
            .expect("tasks mutex poisoned")
            .get(task_id)
            .cloned()
    }

    /// Queue a task and trigger dispatch. Fails once the swarm is shut down.
    pub fn submit_task(
        &self,
        kind: TaskKind,
        payload: Value,
        priority: i32,
        deadline: Option<Duration>,
    ) -> Result<String, SwarmError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SwarmError::ShutDown);
        }

        let now = self.clock.now();
        let id = self.ids.new_id("task");
        let task = SwarmTask {
            id: id.clone(),
            kind,
            priority,
            payload,
            assigned_agent: None,
            status: TaskStatus::Pending,
            created_at: now,
            deadline: deadline
                .map(|d| now + chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero())),
            result: None,
            error: None,
            attempts: 0,
        };

        self.tasks
            .lock()
            .expect("tasks mutex poisoned")
            .insert(id.clone(), task);
        self.queue
            .lock()
            .expect("queue mutex poisoned")
            .push(id.clone(), priority);
        info!(task_id = %id, kind = ?kind, priority, "Task submitted");

        self.trigger_dispatch();
        Ok(id)
    }

    fn trigger_dispatch(&self) {
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        tokio::spawn(async move { this.dispatch().await });
    }

    /// Drain the queue while assignments are possible. Each assignment
    /// spawns an independent handler task.
    async fn dispatch(self: Arc<Self>) {
        loop {
            if self.shut_down.load(Ordering::SeqCst) {
                return;
            }
            let Some((task_id, agent_id)) = self.next_assignment() else {
                return;
            };
            let this = Arc::clone(&self);
            tokio::spawn(async move { this.run_task(task_id, agent_id).await });
        }
    }

    /// One scan over the pending queue: the highest-priority task whose kind
    /// has a free agent is assigned. Tasks whose agents are merely busy keep
    /// their position; tasks with no live agent at all fail immediately.
    fn next_assignment(&self) -> Option<(String, String)> {
        let mut skipped = Vec::new();
        let mut assignment = None;

        loop {
            let popped = self.queue.lock().expect("queue mutex poisoned").pop_slot();
            let Some(slot) = popped else { break };
            let task_id = slot.task_id().to_string();

            let Some((kind, attempts)) = self
                .tasks
                .lock()
                .expect("tasks mutex poisoned")
                .get(&task_id)
                .filter(|t| t.status == TaskStatus::Pending)
                .map(|t| (t.kind, t.attempts))
            else {
                // Stale queue entry for a task that moved on; drop it.
                continue;
            };

            match self.reserve_agent(kind) {
                AgentReservation::Reserved(agent_id) => {
                    self.mark_assigned(&task_id, &agent_id, attempts);
                    assignment = Some((task_id, agent_id));
                    break;
                }
                AgentReservation::AllBusy => skipped.push(slot),
                AgentReservation::NoneAlive => {
                    warn!(task_id = %task_id, kind = ?kind, "No live agent can serve this task");
                    self.finalize_task(
                        &task_id,
                        None,
                        Err(SwarmError::NoEligibleAgents(kind)),
                    );
                }
            }
        }

        // Skipped entries go back exactly where they came from.
        let mut queue = self.queue.lock().expect("queue mutex poisoned");
        for slot in skipped.into_iter().rev() {
            queue.restore(slot);
        }
        drop(queue);

        assignment
    }

    /// Pick the heaviest active agent able to serve `kind`, flipping it to
    /// busy under the same lock so no other dispatch can take it.
    fn reserve_agent(&self, kind: TaskKind) -> AgentReservation {
        let roles = kind.eligible_roles();
        let mut agents = self.agents.lock().expect("agents mutex poisoned");

        let mut any_alive = false;
        let mut best: Option<(&String, f64)> = None;
        for (id, agent) in agents.iter() {
            if !roles.contains(&agent.role) {
                continue;
            }
            if matches!(agent.status, AgentStatus::Active | AgentStatus::Busy) {
                any_alive = true;
            }
            if agent.status == AgentStatus::Active {
                let better = match best {
                    Some((best_id, best_weight)) => {
                        agent.voting_weight > best_weight
                            || (agent.voting_weight == best_weight && id < best_id)
                    }
                    None => true,
                };
                if better {
                    best = Some((id, agent.voting_weight));
                }
            }
        }

        match best.map(|(id, _)| id.clone()) {
            Some(id) => {
                let agent = agents.get_mut(&id).expect("agent present");
                agent.status = AgentStatus::Busy;
                AgentReservation::Reserved(id)
            }
            None if any_alive => AgentReservation::AllBusy,
            None => AgentReservation::NoneAlive,
        }
    }

    fn mark_assigned(&self, task_id: &str, agent_id: &str, attempts: u32) {
        let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
        if let Some(task) = tasks.get_mut(task_id) {
            task.assigned_agent = Some(agent_id.to_string());
            task.status = TaskStatus::Assigned;
            task.attempts = attempts + 1;
            debug!(task_id = %task_id, agent_id = %agent_id, attempt = task.attempts, "Task assigned");
        }
    }

    /// Execute one assigned task on its reserved agent, honoring the
    /// deadline, then release the agent and continue dispatching.
    async fn run_task(self: Arc<Self>, task_id: String, agent_id: String) {
        let (task, attempt) = {
            let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
            let Some(task) = tasks.get_mut(&task_id) else {
                return;
            };
            // The task may have been reclaimed before this attempt started.
            if task.status != TaskStatus::Assigned
                || task.assigned_agent.as_deref() != Some(agent_id.as_str())
            {
                return;
            }
            task.status = TaskStatus::InProgress;
            (task.clone(), task.attempts)
        };
        let Some(agent) = self.agent(&agent_id) else {
            return;
        };

        let outcome = match task.deadline {
            Some(deadline) => {
                let remaining = (deadline - self.clock.now()).to_std().unwrap_or_default();
                if remaining.is_zero() {
                    Err(SwarmError::Timeout {
                        task_id: task_id.clone(),
                    })
                } else {
                    match tokio::time::timeout(remaining, self.handler.execute(&agent, &task)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(SwarmError::Timeout {
                            task_id: task_id.clone(),
                        }),
                    }
                }
            }
            None => self.handler.execute(&agent, &task).await,
        };

        let finalized = self.finalize_attempt(&task_id, &agent_id, attempt, outcome);
        if finalized {
            self.release_agent(&agent_id);
            self.task_done.notify_waiters();
            self.trigger_dispatch();
        }
    }

    /// Commit a handler outcome if the task still belongs to this attempt.
    /// A reclaimed task (failure recovery) ignores stale completions.
    fn finalize_attempt(
        &self,
        task_id: &str,
        agent_id: &str,
        attempt: u32,
        outcome: Result<Value, SwarmError>,
    ) -> bool {
        let still_current = {
            let tasks = self.tasks.lock().expect("tasks mutex poisoned");
            tasks
                .get(task_id)
                .map(|t| {
                    t.status == TaskStatus::InProgress
                        && t.attempts == attempt
                        && t.assigned_agent.as_deref() == Some(agent_id)
                })
                .unwrap_or(false)
        };
        if !still_current {
            debug!(task_id = %task_id, agent_id = %agent_id, "Dropping stale handler outcome");
            return false;
        }

        self.finalize_task(task_id, Some(agent_id), outcome);
        true
    }

    fn finalize_task(
        &self,
        task_id: &str,
        agent_id: Option<&str>,
        outcome: Result<Value, SwarmError>,
    ) {
        let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
        let Some(task) = tasks.get_mut(task_id) else {
            return;
        };
        match outcome {
            Ok(result) => {
                task.status = TaskStatus::Completed;
                task.result = Some(result);
                info!(task_id = %task_id, agent_id = ?agent_id, "Task completed");
            }
            Err(error) => {
                task.status = TaskStatus::Failed;
                task.error = Some(error.to_string());
                warn!(task_id = %task_id, agent_id = ?agent_id, error = %error, "Task failed");
            }
        }
        let completed = task.status == TaskStatus::Completed;
        drop(tasks);

        let mut counters = self.counters.lock().expect("counters mutex poisoned");
        if completed {
            counters.completed += 1;
        } else {
            counters.failed += 1;
        }
        drop(counters);

        self.task_done.notify_waiters();
    }

    fn release_agent(&self, agent_id: &str) {
        let mut agents = self.agents.lock().expect("agents mutex poisoned");
        if let Some(agent) = agents.get_mut(agent_id) {
            if agent.status == AgentStatus::Busy {
                agent.status = AgentStatus::Active;
            }
            agent.last_active = self.clock.now();
        }
    }

    /// Await a task reaching a terminal status.
    pub async fn wait_for_task(
        &self,
        task_id: &str,
        timeout: Duration,
    ) -> Result<SwarmTask, SwarmError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Arm the notification before checking so a completion landing
            // in between is not missed.
            let notified = self.task_done.notified();
            match self.task(task_id) {
                Some(task) if task.status.is_terminal() => return Ok(task),
                Some(_) => {}
                None => return Err(SwarmError::TaskNotFound(task_id.to_string())),
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(SwarmError::Timeout {
                    task_id: task_id.to_string(),
                });
            }
        }
    }

    /// Weighted consensus over a consistent snapshot of the agent set.
    /// Offline and failed agents abstain, lowering participation without
    /// biasing the approval ratio.
    pub async fn request_consensus(
        &self,
        topic: &str,
        payload: Value,
        role_filter: Option<&[AgentRole]>,
    ) -> Result<ConsensusResult, SwarmError> {
        let snapshot = self.agents_snapshot();
        let total_agents = snapshot.len();

        let voters: Vec<Agent> = snapshot
            .into_iter()
            .filter(|a| {
                role_filter
                    .map(|roles| roles.contains(&a.role))
                    .unwrap_or(true)
            })
            .filter(|a| matches!(a.status, AgentStatus::Active | AgentStatus::Busy))
            .collect();

        let mut votes = Vec::with_capacity(voters.len());
        let mut yes_weight = 0.0;
        let mut no_weight = 0.0;
        for agent in &voters {
            match self.handler.vote(agent, topic, &payload).await {
                Ok((decision, confidence, reasoning)) => {
                    let confidence = confidence.clamp(0.0, 1.0);
                    if decision {
                        yes_weight += agent.voting_weight * confidence;
                    } else {
                        no_weight += agent.voting_weight * confidence;
                    }
                    votes.push(Vote {
                        agent_id: agent.id.clone(),
                        decision,
                        confidence,
                        reasoning,
                        timestamp: self.clock.now(),
                    });
                }
                Err(e) => {
                    warn!(agent_id = %agent.id, error = %e, "Voter abstained on handler error");
                }
            }
        }

        let voted_weight = yes_weight + no_weight;
        let approval_ratio = if voted_weight > 0.0 {
            yes_weight / voted_weight
        } else {
            0.0
        };
        let threshold = self.config.consensus_threshold;
        let consensus_reached =
            approval_ratio >= threshold || (1.0 - approval_ratio) >= threshold;
        let decision = approval_ratio >= threshold;
        let confidence = if votes.is_empty() {
            0.0
        } else {
            votes.iter().map(|v| v.confidence).sum::<f64>() / votes.len() as f64
        };
        let participation_rate = if total_agents > 0 {
            votes.len() as f64 / total_agents as f64
        } else {
            0.0
        };

        info!(
            topic = %topic,
            decision,
            consensus_reached,
            approval_ratio,
            votes = votes.len(),
            participation_rate,
            "Consensus round finished"
        );

        Ok(ConsensusResult {
            topic: topic.to_string(),
            decision,
            consensus_reached,
            approval_ratio,
            yes_weight,
            no_weight,
            confidence,
            participation_rate,
            votes,
        })
    }

    /// Mark an agent failed, reclaim its non-terminal task to the head of
    /// the queue, and schedule recovery when enabled. Idempotent.
    pub fn handle_failure(&self, agent_id: &str) -> Result<(), SwarmError> {
        {
            let mut agents = self.agents.lock().expect("agents mutex poisoned");
            let Some(agent) = agents.get_mut(agent_id) else {
                return Err(SwarmError::AgentNotFound(agent_id.to_string()));
            };
            if agent.status == AgentStatus::Failed {
                return Ok(());
            }
            agent.status = AgentStatus::Failed;
            warn!(agent_id = %agent_id, "Agent marked failed");
        }

        // Reclaim whatever the agent was working on.
        let reclaimed: Option<String> = {
            let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
            tasks
                .values_mut()
                .find(|t| {
                    t.assigned_agent.as_deref() == Some(agent_id) && !t.status.is_terminal()
                })
                .map(|task| {
                    task.assigned_agent = None;
                    task.status = TaskStatus::Pending;
                    task.id.clone()
                })
        };
        if let Some(task_id) = reclaimed {
            self.queue
                .lock()
                .expect("queue mutex poisoned")
                .push_urgent(task_id.clone());
            info!(task_id = %task_id, agent_id = %agent_id, "Task reclaimed to queue head");
        }

        if self.config.recovery_enabled {
            let Some(this) = self.self_ref.upgrade() else {
                return Ok(());
            };
            let id = agent_id.to_string();
            let delay = self.config.recovery_delay;
            tokio::spawn(async move {
                this.clock.sleep(delay).await;
                let recovered = {
                    let mut agents = this.agents.lock().expect("agents mutex poisoned");
                    match agents.get_mut(&id) {
                        Some(agent) if agent.status == AgentStatus::Failed => {
                            agent.status = AgentStatus::Active;
                            agent.last_active = this.clock.now();
                            true
                        }
                        _ => false,
                    }
                };
                if recovered {
                    info!(agent_id = %id, "Agent recovered");
                    this.trigger_dispatch();
                }
            });
        }

        self.trigger_dispatch();
        Ok(())
    }

    /// Take every agent offline and clear pending work. In-progress tasks
    /// finish on their own; no new dispatch happens. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut agents = self.agents.lock().expect("agents mutex poisoned");
        for agent in agents.values_mut() {
            agent.status = AgentStatus::Offline;
        }
        drop(agents);

        self.queue.lock().expect("queue mutex poisoned").clear();
        info!("Swarm shut down; agents offline, pending queue cleared");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SwarmStatus {
        let agents = self.agents.lock().expect("agents mutex poisoned");
        let mut status = SwarmStatus {
            agents_total: agents.len(),
            ..SwarmStatus::default()
        };
        for agent in agents.values() {
            match agent.status {
                AgentStatus::Active => status.agents_active += 1,
                AgentStatus::Busy => status.agents_busy += 1,
                AgentStatus::Offline => status.agents_offline += 1,
                AgentStatus::Failed => status.agents_failed += 1,
            }
        }
        drop(agents);

        status.queued_tasks = self.queue.lock().expect("queue mutex poisoned").len();
        let counters = *self.counters.lock().expect("counters mutex poisoned");
        status.tasks_completed = counters.completed;
        status.tasks_failed = counters.failed;
        status
    }
}

enum AgentReservation {
    Reserved(String),
    AllBusy,
    NoneAlive,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedHandler;
    use async_trait::async_trait;
    use paymesh_common::SystemClock;
    use serde_json::json;

    fn short_recovery_config() -> SwarmConfig {
        SwarmConfig {
            recovery_delay: Duration::from_millis(20),
            ..SwarmConfig::default()
        }
    }

    fn coordinator_with(handler: Arc<dyn AgentHandler>) -> Arc<SwarmCoordinator> {
        SwarmCoordinator::new(short_recovery_config(), Arc::new(SystemClock), handler)
    }

    /// Sleeps for a fixed delay, then records the task's payload label.
    struct RecordingHandler {
        delay: Duration,
        order: Mutex<Vec<String>>,
    }

    impl RecordingHandler {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                order: Mutex::new(Vec::new()),
            }
        }

        fn order(&self) -> Vec<String> {
            self.order.lock().expect("order mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl AgentHandler for RecordingHandler {
        async fn execute(&self, _agent: &Agent, task: &SwarmTask) -> Result<Value, SwarmError> {
            tokio::time::sleep(self.delay).await;
            let label = task.payload["label"].as_str().unwrap_or("?").to_string();
            self.order.lock().expect("order mutex poisoned").push(label);
            Ok(json!({ "ok": true }))
        }

        async fn vote(
            &self,
            _agent: &Agent,
            _topic: &str,
            _payload: &Value,
        ) -> Result<(bool, f64, String), SwarmError> {
            Ok((true, 1.0, "recorded".to_string()))
        }
    }

    /// Approves unless the agent's role is on the reject list; full
    /// confidence either way so tallies stay exact.
    struct RoleVoteHandler {
        reject: Vec<AgentRole>,
    }

    #[async_trait]
    impl AgentHandler for RoleVoteHandler {
        async fn execute(&self, _agent: &Agent, _task: &SwarmTask) -> Result<Value, SwarmError> {
            Ok(json!({}))
        }

        async fn vote(
            &self,
            agent: &Agent,
            _topic: &str,
            _payload: &Value,
        ) -> Result<(bool, f64, String), SwarmError> {
            let decision = !self.reject.contains(&agent.role);
            Ok((decision, 1.0, format!("{:?} fixed vote", agent.role)))
        }
    }

    #[tokio::test]
    async fn test_submit_and_complete() {
        let coordinator =
            coordinator_with(Arc::new(SimulatedHandler::new(SwarmConfig::default().role_priors)));
        let agent_id = coordinator.add_agent(AgentRole::Executor, 1.5, vec![]);

        let task_id = coordinator
            .submit_task(TaskKind::Execute, json!({"payment": "p1"}), 5, None)
            .unwrap();
        let task = coordinator
            .wait_for_task(&task_id, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.result.is_some());
        assert_eq!(task.assigned_agent.as_deref(), Some(agent_id.as_str()));

        let status = coordinator.status();
        assert_eq!(status.tasks_completed, 1);
        assert_eq!(status.tasks_failed, 0);
        assert_eq!(coordinator.agent(&agent_id).unwrap().status, AgentStatus::Active);
    }

    #[tokio::test]
    async fn test_priority_order_with_fifo_ties() {
        let handler = Arc::new(RecordingHandler::new(Duration::from_millis(60)));
        let coordinator = coordinator_with(handler.clone());
        coordinator.add_agent(AgentRole::Executor, 1.0, vec![]);

        let first = coordinator
            .submit_task(TaskKind::Execute, json!({"label": "first"}), 5, None)
            .unwrap();
        // Let the first task occupy the only executor before queueing more.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut waited = vec![first];
        for (label, priority) in [("low", 1), ("high", 9), ("mid", 5), ("mid2", 5)] {
            waited.push(
                coordinator
                    .submit_task(TaskKind::Execute, json!({"label": label}), priority, None)
                    .unwrap(),
            );
        }
        for task_id in &waited {
            coordinator
                .wait_for_task(task_id, Duration::from_secs(2))
                .await
                .unwrap();
        }

        assert_eq!(handler.order(), vec!["first", "high", "mid", "mid2", "low"]);
    }

    #[tokio::test]
    async fn test_no_live_agent_fails_task() {
        let coordinator =
            coordinator_with(Arc::new(SimulatedHandler::new(SwarmConfig::default().role_priors)));
        coordinator.add_agent(AgentRole::Executor, 1.0, vec![]);

        let task_id = coordinator
            .submit_task(TaskKind::Optimize, json!({}), 5, None)
            .unwrap();
        let task = coordinator
            .wait_for_task(&task_id, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.as_deref().unwrap().contains("no eligible agents"));
        assert_eq!(coordinator.status().tasks_failed, 1);
    }

    #[tokio::test]
    async fn test_consensus_weighted_quorum() {
        let coordinator = coordinator_with(Arc::new(RoleVoteHandler {
            reject: vec![AgentRole::RiskAssessor],
        }));
        for _ in 0..3 {
            coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);
        }
        for _ in 0..2 {
            coordinator.add_agent(AgentRole::Executor, 1.5, vec![]);
        }
        for _ in 0..2 {
            coordinator.add_agent(AgentRole::Optimizer, 1.0, vec![]);
        }
        coordinator.add_agent(AgentRole::RiskAssessor, 2.0, vec![]);

        let result = coordinator
            .request_consensus("approve-payment", json!({"amount": 50000}), None)
            .await
            .unwrap();

        assert_eq!(result.votes.len(), 8);
        assert!((result.yes_weight - 8.0).abs() < 1e-9);
        assert!((result.no_weight - 2.0).abs() < 1e-9);
        assert!((result.approval_ratio - 0.8).abs() < 1e-9);
        assert!(result.decision);
        assert!(result.consensus_reached);
        assert!((result.participation_rate - 1.0).abs() < 1e-9);
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_swarm_consensus() {
        let coordinator = coordinator_with(Arc::new(RoleVoteHandler { reject: vec![] }));
        let result = coordinator
            .request_consensus("anything", json!({}), None)
            .await
            .unwrap();

        assert!(!result.decision);
        assert!(!result.consensus_reached);
        assert!(result.votes.is_empty());
        assert_eq!(result.participation_rate, 0.0);
    }

    #[tokio::test]
    async fn test_unanimous_threshold() {
        let config = SwarmConfig {
            consensus_threshold: 1.0,
            ..SwarmConfig::default()
        };

        // One dissenting risk assessor blocks unanimity in both directions.
        let coordinator = SwarmCoordinator::new(
            config.clone(),
            Arc::new(SystemClock),
            Arc::new(RoleVoteHandler {
                reject: vec![AgentRole::RiskAssessor],
            }),
        );
        coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);
        coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);
        coordinator.add_agent(AgentRole::RiskAssessor, 1.0, vec![]);

        let split = coordinator
            .request_consensus("upgrade", json!({}), None)
            .await
            .unwrap();
        assert!(!split.decision);
        assert!(!split.consensus_reached);

        // Without the dissenter the same swarm reaches unanimous approval.
        let unanimous_coordinator = SwarmCoordinator::new(
            config,
            Arc::new(SystemClock),
            Arc::new(RoleVoteHandler { reject: vec![] }),
        );
        unanimous_coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);
        unanimous_coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);

        let unanimous = unanimous_coordinator
            .request_consensus("upgrade", json!({}), None)
            .await
            .unwrap();
        assert!(unanimous.decision);
        assert!(unanimous.consensus_reached);
    }

    #[tokio::test]
    async fn test_role_filter_and_participation() {
        let coordinator = coordinator_with(Arc::new(RoleVoteHandler { reject: vec![] }));
        coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);
        coordinator.add_agent(AgentRole::Executor, 1.0, vec![]);

        let result = coordinator
            .request_consensus("validate-only", json!({}), Some(&[AgentRole::Validator]))
            .await
            .unwrap();

        assert_eq!(result.votes.len(), 1);
        // One ballot across a two-agent swarm.
        assert!((result.participation_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_agent_abstains() {
        let config = SwarmConfig {
            recovery_enabled: false,
            ..SwarmConfig::default()
        };
        let coordinator = SwarmCoordinator::new(
            config,
            Arc::new(SystemClock),
            Arc::new(RoleVoteHandler { reject: vec![] }),
        );
        coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);
        let down = coordinator.add_agent(AgentRole::Validator, 3.0, vec![]);
        coordinator.handle_failure(&down).unwrap();

        let result = coordinator
            .request_consensus("quorum", json!({}), None)
            .await
            .unwrap();

        // The failed heavyweight abstains: participation drops, the ratio
        // stays unbiased.
        assert_eq!(result.votes.len(), 1);
        assert!((result.participation_rate - 0.5).abs() < 1e-9);
        assert!((result.approval_ratio - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failure_reclaims_task_and_recovers() {
        let handler = Arc::new(RecordingHandler::new(Duration::from_millis(100)));
        let coordinator = coordinator_with(handler.clone());
        let agent_id = coordinator.add_agent(AgentRole::Executor, 1.0, vec![]);

        let task_id = coordinator
            .submit_task(TaskKind::Execute, json!({"label": "flaky"}), 5, None)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        coordinator.handle_failure(&agent_id).unwrap();
        assert_eq!(
            coordinator.agent(&agent_id).unwrap().status,
            AgentStatus::Failed
        );

        // Recovery flips the agent back after the configured delay and the
        // reclaimed task runs to completion on a fresh attempt.
        let task = coordinator
            .wait_for_task(&task_id, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.attempts, 2);
        assert_eq!(
            coordinator.agent(&agent_id).unwrap().status,
            AgentStatus::Active
        );
    }

    #[tokio::test]
    async fn test_handle_failure_is_idempotent() {
        let coordinator =
            coordinator_with(Arc::new(SimulatedHandler::new(SwarmConfig::default().role_priors)));
        let agent_id = coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);

        coordinator.handle_failure(&agent_id).unwrap();
        coordinator.handle_failure(&agent_id).unwrap();
        assert!(matches!(
            coordinator.handle_failure("agent_missing"),
            Err(SwarmError::AgentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deadline_failure_releases_agent() {
        let handler = Arc::new(RecordingHandler::new(Duration::from_millis(200)));
        let coordinator = coordinator_with(handler);
        let agent_id = coordinator.add_agent(AgentRole::Executor, 1.0, vec![]);

        let task_id = coordinator
            .submit_task(
                TaskKind::Execute,
                json!({"label": "slow"}),
                5,
                Some(Duration::from_millis(30)),
            )
            .unwrap();
        let task = coordinator
            .wait_for_task(&task_id, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.as_deref().unwrap().contains("deadline"));
        assert_eq!(
            coordinator.agent(&agent_id).unwrap().status,
            AgentStatus::Active
        );
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_rejects_submits() {
        let coordinator =
            coordinator_with(Arc::new(SimulatedHandler::new(SwarmConfig::default().role_priors)));
        coordinator.add_agent(AgentRole::Executor, 1.0, vec![]);
        coordinator.add_agent(AgentRole::Validator, 1.0, vec![]);

        coordinator.shutdown();
        coordinator.shutdown();

        let status = coordinator.status();
        assert_eq!(status.agents_offline, 2);
        assert_eq!(status.queued_tasks, 0);
        assert!(coordinator.is_shut_down());
        assert!(matches!(
            coordinator.submit_task(TaskKind::Execute, json!({}), 5, None),
            Err(SwarmError::ShutDown)
        ));
    }
}
