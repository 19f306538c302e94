//! The main entry point for simulation configuration and execution.

use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::rc::Rc;

use sugars::{rc, refcell};

use crate::core::carbon::carbon_cost;
use crate::core::config::{NodeConfig, SimulationConfig, SiteConfig};
use crate::core::events::{Event, EventKind};
use crate::core::log_entry::LogEntry;
use crate::core::node::Node;
use crate::core::placement_algorithm::{placement_algorithm_resolver, PlacementAlgorithm};
use crate::core::site::Site;
use crate::core::workload::Workload;
use crate::{log_debug, log_trace};

/// Discrete-event simulation of carbon-aware workload scheduling.
///
/// Owns the logical clock, the event list, the node fleet, the pending queue
/// and the placement log. The clock never reads wall time; it only advances
/// to event instants. Runs are fully deterministic for fixed inputs and
/// policy: events are processed in non-decreasing time order with
/// insertion-order tie-breaking, and resources released at an instant are
/// visible to every placement decision at that instant.
pub struct ClusterSimulation {
    clock: f64,
    events: BinaryHeap<Event>,
    event_count: u64,
    nodes: Vec<Rc<RefCell<Node>>>,
    node_index: HashMap<String, usize>,
    sites: HashMap<String, Rc<Site>>,
    pending: VecDeque<Workload>,
    log: Vec<LogEntry>,
    policy: Box<dyn PlacementAlgorithm>,
    batch_size: usize,
}

impl ClusterSimulation {
    /// Creates a simulation with the policy, sites and nodes described by the
    /// config.
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_policy(config, placement_algorithm_resolver(config))
    }

    /// Creates a simulation with an explicitly constructed policy.
    pub fn with_policy(config: &SimulationConfig, policy: Box<dyn PlacementAlgorithm>) -> Self {
        let mut sim = Self {
            clock: 0.,
            events: BinaryHeap::new(),
            event_count: 0,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            sites: HashMap::new(),
            pending: VecDeque::new(),
            log: Vec::new(),
            policy,
            batch_size: config.batch_size.max(1),
        };
        for site_config in &config.sites {
            sim.add_site(site_config);
        }
        for node_config in config.nodes.clone() {
            sim.add_nodes_from_config(&node_config);
        }
        sim
    }

    /// Registers a site so that subsequent nodes can reference it by id.
    pub fn add_site(&mut self, config: &SiteConfig) -> Rc<Site> {
        let site = Rc::new(Site::new(&config.id, config.pue, config.k, &config.region));
        self.sites.insert(config.id.clone(), site.clone());
        site
    }

    /// Creates an idle node and adds it to the fleet, returning a handle for
    /// later inspection.
    pub fn add_node(&mut self, name: &str, cpus: f64, memory: f64, ci_profile: &str) -> Rc<RefCell<Node>> {
        self.register_node(Node::new(name, cpus, memory, ci_profile))
    }

    /// Adds a fully built node (site handle, metadata) to the fleet.
    pub fn register_node(&mut self, node: Node) -> Rc<RefCell<Node>> {
        let name = node.name().to_string();
        let handle = rc!(refcell!(node));
        self.node_index.insert(name, self.nodes.len());
        self.nodes.push(handle.clone());
        handle
    }

    fn add_nodes_from_config(&mut self, config: &NodeConfig) {
        let count = config.count.unwrap_or(1);
        for i in 0..count {
            let name = if count == 1 {
                config.name.clone().unwrap_or_else(|| panic!("node config without name"))
            } else {
                let prefix = config
                    .name_prefix
                    .clone()
                    .unwrap_or_else(|| panic!("node config without name_prefix"));
                format!("{}{}", prefix, i + 1)
            };
            let mut node = Node::new(&name, config.cpus, config.memory, &config.ci_profile);
            if let Some(site_id) = &config.site {
                let site = self
                    .sites
                    .get(site_id)
                    .unwrap_or_else(|| panic!("unknown site {} for node {}", site_id, name));
                node = node.with_site(site.clone());
            }
            if let Some(peak) = config.peak_power_w {
                node = node.with_metadata("peak_power_w", &peak.to_string());
            }
            self.register_node(node);
        }
    }

    /// Returns the handle of the node with the given name.
    ///
    /// Panics if no such node exists.
    pub fn node(&self, name: &str) -> Rc<RefCell<Node>> {
        self.nodes[self.node_index[name]].clone()
    }

    /// Returns handles of all nodes in insertion order.
    pub fn nodes(&self) -> &[Rc<RefCell<Node>>] {
        &self.nodes
    }

    /// Sets the number of pending jobs that triggers a batch flush.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        if batch_size > 0 {
            self.batch_size = batch_size;
        }
    }

    /// Schedules the arrival event for a workload at its submission instant.
    ///
    /// Submissions in the engine's past are accepted but are handled at the
    /// current clock, so they only accumulate waiting time.
    pub fn add_workload(&mut self, workload: Workload) {
        let time = workload.submit_time;
        self.push_event(time, EventKind::JobArrival { workload });
    }

    fn push_event(&mut self, time: f64, kind: EventKind) {
        self.events.push(Event {
            id: self.event_count,
            time,
            kind,
        });
        self.event_count += 1;
    }

    /// Drains the event list, then flushes whatever is still pending once at
    /// the final clock.
    pub fn run(&mut self) {
        while let Some(event) = self.events.pop() {
            self.clock = self.clock.max(event.time);
            self.process_releases();
            self.handle_event(event);
        }
        // releases at the terminal clock may have freed enough capacity
        self.schedule_batch();
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Component name used by the logging macros.
    pub fn name(&self) -> &str {
        "simulation"
    }

    /// Name of the active placement policy.
    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// All placement decisions made so far, in placement order.
    pub fn logs(&self) -> &[LogEntry] {
        &self.log
    }

    /// Jobs that are still waiting for capacity.
    pub fn pending_residue(&self) -> impl Iterator<Item = &Workload> {
        self.pending.iter()
    }

    /// Total number of created events.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Frees every reservation that ended at or before the current clock,
    /// then walks the pending queue in arrival order. The backfill attempt is
    /// unconditional: a pending job whose head is feasible must be placed
    /// before the event itself is handled, whether or not this instant freed
    /// anything.
    fn process_releases(&mut self) {
        let mut released = 0;
        for node in &self.nodes {
            released += node.borrow_mut().release(self.clock);
        }
        if released > 0 {
            log_trace!(self, "released {} reservations", released);
        }
        if !self.pending.is_empty() {
            self.try_place_pending();
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event.kind {
            EventKind::JobArrival { workload } => {
                log_debug!(self, "job {} submitted", workload.id);
                self.pending.push_back(workload);
                if self.pending.len() >= self.batch_size {
                    self.schedule_batch();
                }
            }
            EventKind::JobEnd { workload, node } => {
                // resources were already returned in the release phase
                log_debug!(self, "job {} ended on {}", workload.id, node);
            }
        }
    }

    /// Attempts to place everything pending. Policies with a batch mode get
    /// the whole queue at once; the rest are applied job by job in arrival
    /// order.
    fn schedule_batch(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let jobs: Vec<Workload> = self.pending.iter().cloned().collect();
        match self.policy.assign_batch(&jobs, &self.nodes, self.clock) {
            Some(assignment) => {
                self.pending.clear();
                for (workload, target) in jobs.into_iter().zip(assignment) {
                    let placed = match target {
                        Some(node_index) => self.try_place(&workload, node_index),
                        None => false,
                    };
                    if !placed {
                        self.pending.push_back(workload);
                    }
                }
            }
            None => self.try_place_pending(),
        }
    }

    /// Walks the pending queue in arrival order, asking the policy for a node
    /// per job. Jobs that cannot be placed keep their position.
    fn try_place_pending(&mut self) {
        let jobs: Vec<Workload> = self.pending.drain(..).collect();
        for workload in jobs {
            let placed = match self.policy.select_node(&workload, &self.nodes, self.clock) {
                Some(name) => match self.node_index.get(&name).copied() {
                    Some(node_index) => self.try_place(&workload, node_index),
                    None => false,
                },
                None => false,
            };
            if !placed {
                self.pending.push_back(workload);
            }
        }
    }

    /// Reserves the node, schedules the completion event and appends the log
    /// entry. The job's wait is the span from submission to the current
    /// clock.
    fn try_place(&mut self, workload: &Workload, node_index: usize) -> bool {
        let node = self.nodes[node_index].clone();
        {
            let node = node.borrow();
            if !node.can_accept(workload) {
                return false;
            }
        }
        let start = self.clock;
        let end = workload.end_time(start);
        let ci_cost = carbon_cost(&node.borrow(), workload, start);
        node.borrow_mut().reserve(workload, start);

        let node_name = node.borrow().name().to_string();
        self.push_event(
            end,
            EventKind::JobEnd {
                workload: workload.clone(),
                node: node_name.clone(),
            },
        );
        log_debug!(self, "job {} placed on {}", workload.id, node_name);
        self.log.push(LogEntry {
            job_id: workload.id.clone(),
            node: node_name,
            submit: workload.submit_time,
            start,
            end,
            wait_ms: ((start - workload.submit_time) * 1000.).round() as i64,
            ci_cost,
        });
        true
    }
}
