use std::collections::{BTreeMap, HashMap, VecDeque};

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    agenda::{Agenda, OccurrenceAggregator, TaskOccurrences},
    config::ScheduleConfig,
    task::{CareTaskRule, PlantMeta},
    window::CalendarRange,
};

/// Tasks and plants as exported by the persistence layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleExport {
    #[serde(default)]
    pub plants: Vec<PlantMeta>,
    #[serde(default)]
    pub tasks: Vec<CareTaskRule>,
}

/// Distinct ranges whose expansions are retained; older ones are evicted.
const CACHED_RANGE_CAPACITY: usize = 4;

#[derive(Default)]
struct ExpansionCache {
    /// Most recently queried range first.
    ranges: VecDeque<CalendarRange>,
    entries: HashMap<(String, CalendarRange), Option<TaskOccurrences>>,
}

impl ExpansionCache {
    fn touch(&mut self, range: &CalendarRange) {
        if let Some(pos) = self.ranges.iter().position(|cached| cached == range) {
            self.ranges.remove(pos);
        }
        self.ranges.push_front(*range);
        while self.ranges.len() > CACHED_RANGE_CAPACITY {
            if let Some(evicted) = self.ranges.pop_back() {
                self.entries.retain(|(_, cached), _| *cached != evicted);
                debug!(start = %evicted.start(), end = %evicted.end(), "evicted cached range");
            }
        }
    }
}

/// In-memory view over the current tasks and plants that answers calendar
/// queries, reusing per-task expansions until the task changes.
pub struct CareScheduleService {
    tasks: RwLock<BTreeMap<String, CareTaskRule>>,
    plants: RwLock<HashMap<String, PlantMeta>>,
    cache: RwLock<ExpansionCache>,
    aggregator: OccurrenceAggregator,
}

pub struct CareScheduleServiceBuilder {
    tasks: Vec<CareTaskRule>,
    plants: Vec<PlantMeta>,
    config: ScheduleConfig,
}

impl CareScheduleServiceBuilder {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            plants: Vec::new(),
            config: ScheduleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScheduleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_task(mut self, task: CareTaskRule) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn add_plant(mut self, plant: PlantMeta) -> Self {
        self.plants.push(plant);
        self
    }

    pub fn with_export(mut self, export: ScheduleExport) -> Self {
        self.tasks.extend(export.tasks);
        self.plants.extend(export.plants);
        self
    }

    pub fn build(self) -> CareScheduleService {
        let mut tasks = BTreeMap::new();
        for task in self.tasks {
            if let Some(previous) = tasks.insert(task.id.clone(), task) {
                debug!(task_id = %previous.id, "replacing duplicate task id");
            }
        }
        let plants = self
            .plants
            .into_iter()
            .map(|plant| (plant.id.clone(), plant))
            .collect();
        CareScheduleService {
            tasks: RwLock::new(tasks),
            plants: RwLock::new(plants),
            cache: RwLock::new(ExpansionCache::default()),
            aggregator: OccurrenceAggregator::new(self.config),
        }
    }
}

impl Default for CareScheduleServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CareScheduleService {
    pub fn builder() -> CareScheduleServiceBuilder {
        CareScheduleServiceBuilder::new()
    }

    pub fn config(&self) -> &ScheduleConfig {
        self.aggregator.config()
    }

    pub fn tasks(&self) -> Vec<CareTaskRule> {
        self.tasks.read().values().cloned().collect()
    }

    pub fn task(&self, id: &str) -> Result<CareTaskRule> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("task `{id}` not loaded"))
    }

    pub fn plants(&self) -> Vec<PlantMeta> {
        let mut plants: Vec<PlantMeta> = self.plants.read().values().cloned().collect();
        plants.sort_by(|a, b| a.id.cmp(&b.id));
        plants
    }

    pub fn upsert_task(&self, task: CareTaskRule) {
        // Invalidate under the task lock so an in-flight agenda cannot
        // re-insert an expansion of the old rule.
        let mut tasks = self.tasks.write();
        self.invalidate(&task.id);
        tasks.insert(task.id.clone(), task);
    }

    pub fn remove_task(&self, id: &str) -> Result<CareTaskRule> {
        let mut tasks = self.tasks.write();
        let removed = tasks
            .remove(id)
            .ok_or_else(|| anyhow!("task `{id}` not loaded"))?;
        self.invalidate(id);
        Ok(removed)
    }

    /// Plant metadata only decorates output, so cached expansions stay valid.
    pub fn upsert_plant(&self, plant: PlantMeta) {
        self.plants.write().insert(plant.id.clone(), plant);
    }

    pub fn remove_plant(&self, id: &str) -> Result<PlantMeta> {
        self.plants
            .write()
            .remove(id)
            .ok_or_else(|| anyhow!("plant `{id}` not loaded"))
    }

    #[instrument(skip(self))]
    pub fn agenda(&self, range: &CalendarRange) -> Agenda {
        let tasks = self.tasks.read();
        self.cache.write().touch(range);
        let plants = self.plants.read();
        let plant_index: HashMap<&str, &PlantMeta> = plants
            .iter()
            .map(|(id, plant)| (id.as_str(), plant))
            .collect();
        self.aggregator
            .assemble(tasks.values(), &plant_index, range, |rule| {
                self.cached_occurrences(rule, range)
            })
    }

    /// Number of cached per-task expansions across all retained ranges.
    pub fn cached_ranges(&self) -> usize {
        self.cache.read().entries.len()
    }

    fn cached_occurrences(
        &self,
        rule: &CareTaskRule,
        range: &CalendarRange,
    ) -> Option<TaskOccurrences> {
        let key = (rule.id.clone(), *range);
        if let Some(hit) = self.cache.read().entries.get(&key) {
            return hit.clone();
        }
        let computed = self.aggregator.task_occurrences(rule, range);
        let mut cache = self.cache.write();
        if cache.ranges.contains(range) {
            cache.entries.insert(key, computed.clone());
        }
        computed
    }

    fn invalidate(&self, task_id: &str) {
        self.cache.write().entries.retain(|(id, _), _| id != task_id);
    }
}
