//! AudioContext — a small node graph rendered in Rust.
//!
//! Nodes live until they can no longer make sound: a source is released
//! once its stop time has passed, and a processing node once nothing live
//! feeds it. Disposal runs at the end of every `render` call.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, trace};

use crate::error::FxError;

use super::envelope::{AudioParam, ParamEvent};
use super::filter::BiquadFilter;
use super::graph::{AudioHost, NodeId};
use super::mixer::Mixer;
use super::oscillator::{Oscillator, Waveform};

/// Sample rates a context accepts (the WebAudio range).
pub const MIN_SAMPLE_RATE: f64 = 3000.0;
pub const MAX_SAMPLE_RATE: f64 = 768_000.0;

#[derive(Debug, Clone)]
enum NodeKind {
    Destination,
    Oscillator {
        osc: Oscillator,
        start: Option<f64>,
        stop: Option<f64>,
    },
    Gain {
        gain: AudioParam,
    },
    Lowpass {
        filter: BiquadFilter,
    },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    outputs: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            outputs: Vec::new(),
        }
    }

    fn process(&mut self, input: f64, t: f64) -> f64 {
        match &mut self.kind {
            NodeKind::Destination => input,
            NodeKind::Oscillator { osc, start, stop } => {
                let started = start.is_some_and(|s| t >= s);
                let stopped = stop.is_some_and(|s| t >= s);
                if started && !stopped {
                    osc.next_sample()
                } else {
                    0.0
                }
            }
            NodeKind::Gain { gain } => input * gain.value_at(t),
            NodeKind::Lowpass { filter } => filter.process(input),
        }
    }
}

/// Evaluation order for one render call. Indices refer to key order of
/// the node map.
struct RenderPlan {
    order: Vec<usize>,
    inputs: Vec<Vec<usize>>,
    destination: usize,
}

/// An owned audio context. Create one at startup and pass it by `&mut`
/// to whatever schedules sound.
#[derive(Debug, Clone)]
pub struct AudioContext {
    sample_rate: f64,
    frames: u64,
    next_id: u32,
    destination: NodeId,
    nodes: BTreeMap<NodeId, Node>,
    mixer: Mixer,
}

impl AudioContext {
    pub fn new(sample_rate: f64) -> Result<Self, FxError> {
        if !sample_rate.is_finite() || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate)
        {
            return Err(FxError::UnsupportedSampleRate(sample_rate));
        }

        let destination = NodeId(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(destination, Node::new(NodeKind::Destination));
        debug!("audio context created at {sample_rate} Hz");

        Ok(AudioContext {
            sample_rate,
            frames: 0,
            next_id: 1,
            destination,
            nodes,
            mixer: Mixer::default(),
        })
    }

    /// Set the destination bus master gain and soft clipping.
    pub fn with_master(mut self, gain: f64, soft_clip: bool) -> Self {
        self.mixer = Mixer::new(gain, soft_clip);
        self
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Nodes currently alive, the destination included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the destination is left.
    pub fn is_idle(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Render `frames` mono samples and advance the clock.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let plan = self.plan();
        let start = self.frames;
        let sample_rate = self.sample_rate;

        self.mixer.clear(frames);
        let mut slots: Vec<&mut Node> = self.nodes.values_mut().collect();
        let mut values = vec![0.0_f64; slots.len()];
        for i in 0..frames {
            let t = (start + i as u64) as f64 / sample_rate;
            for &k in &plan.order {
                let input: f64 = plan.inputs[k].iter().map(|&j| values[j]).sum();
                values[k] = slots[k].process(input, t);
            }
            self.mixer.add(i, values[plan.destination]);
        }
        drop(slots);

        self.frames += frames as u64;
        self.dispose_finished(&plan);
        self.mixer.output()
    }

    /// Render until every voice has been released, or `max_seconds` elapse.
    pub fn render_until_idle(&mut self, max_seconds: f64) -> Vec<f32> {
        const BLOCK: usize = 128;
        let limit = (max_seconds.max(0.0) * self.sample_rate) as usize;
        let mut out = Vec::new();
        while !self.is_idle() && out.len() < limit {
            let block = BLOCK.min(limit - out.len());
            out.extend(self.render(block));
        }
        out
    }

    /// Topological order over the current graph (Kahn's algorithm).
    fn plan(&self) -> RenderPlan {
        let index: HashMap<NodeId, usize> = self
            .nodes
            .keys()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let n = index.len();

        let mut inputs = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        for (i, node) in self.nodes.values().enumerate() {
            for out in &node.outputs {
                if let Some(&j) = index.get(out) {
                    inputs[j].push(i);
                    indegree[j] += 1;
                }
            }
        }

        let outputs: Vec<Vec<usize>> = self
            .nodes
            .values()
            .map(|node| node.outputs.iter().filter_map(|o| index.get(o).copied()).collect())
            .collect();

        let mut ready: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &j in &outputs[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push_back(j);
                }
            }
        }

        RenderPlan {
            order,
            inputs,
            destination: index[&self.destination],
        }
    }

    fn dispose_finished(&mut self, plan: &RenderPlan) {
        let now = self.current_time();
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        let kinds: Vec<&NodeKind> = self.nodes.values().map(|n| &n.kind).collect();

        let mut alive = vec![false; ids.len()];
        for &k in &plan.order {
            alive[k] = match kinds[k] {
                NodeKind::Destination => true,
                NodeKind::Oscillator { stop, .. } => stop.is_none_or(|s| s > now),
                NodeKind::Gain { .. } | NodeKind::Lowpass { .. } => {
                    plan.inputs[k].iter().any(|&j| alive[j])
                }
            };
        }

        let dead: Vec<NodeId> = ids
            .iter()
            .zip(&alive)
            .filter(|(_, alive)| !**alive)
            .map(|(id, _)| *id)
            .collect();
        if dead.is_empty() {
            return;
        }

        for id in &dead {
            self.nodes.remove(id);
        }
        for node in self.nodes.values_mut() {
            node.outputs.retain(|o| !dead.contains(o));
        }
        trace!("released {} audio nodes at t={now:.3}", dead.len());
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(kind));
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, FxError> {
        self.nodes.get_mut(&id).ok_or(FxError::UnknownNode(id))
    }

    fn source_mut(&mut self, id: NodeId) -> Result<(&mut Option<f64>, &mut Option<f64>), FxError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Oscillator { start, stop, .. } => Ok((start, stop)),
            _ => Err(FxError::WrongNodeKind {
                node: id,
                expected: "source node",
            }),
        }
    }

    /// Is `to` reachable from `from` along outputs?
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = Vec::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.outputs.iter().copied());
            }
        }
        false
    }
}

impl AudioHost for AudioContext {
    fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f64) -> NodeId {
        let osc = Oscillator::new(waveform, frequency, self.sample_rate);
        self.insert(NodeKind::Oscillator {
            osc,
            start: None,
            stop: None,
        })
    }

    fn create_gain(&mut self) -> NodeId {
        self.insert(NodeKind::Gain {
            gain: AudioParam::new(1.0),
        })
    }

    fn create_lowpass(&mut self, cutoff: f64, q: f64) -> NodeId {
        let filter = BiquadFilter::lowpass(cutoff, q, self.sample_rate);
        self.insert(NodeKind::Lowpass { filter })
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), FxError> {
        if !self.nodes.contains_key(&to) {
            return Err(FxError::UnknownNode(to));
        }
        if matches!(self.node_mut(to)?.kind, NodeKind::Oscillator { .. }) {
            return Err(FxError::WrongNodeKind {
                node: to,
                expected: "node with an input",
            });
        }
        if matches!(self.node_mut(from)?.kind, NodeKind::Destination) {
            return Err(FxError::WrongNodeKind {
                node: from,
                expected: "node with an output",
            });
        }
        if self.reaches(to, from) {
            return Err(FxError::GraphCycle { from, to });
        }

        let node = self.node_mut(from)?;
        if !node.outputs.contains(&to) {
            node.outputs.push(to);
        }
        Ok(())
    }

    fn schedule(&mut self, gain: NodeId, event: ParamEvent) -> Result<(), FxError> {
        match &mut self.node_mut(gain)?.kind {
            NodeKind::Gain { gain: param } => Ok(param.schedule(event)?),
            _ => Err(FxError::WrongNodeKind {
                node: gain,
                expected: "gain node",
            }),
        }
    }

    fn start(&mut self, source: NodeId, when: f64) -> Result<(), FxError> {
        let (start, _) = self.source_mut(source)?;
        *start = Some(when);
        Ok(())
    }

    fn stop(&mut self, source: NodeId, when: f64) -> Result<(), FxError> {
        let (_, stop) = self.source_mut(source)?;
        *stop = Some(when);
        Ok(())
    }
}
