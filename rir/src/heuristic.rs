//! Cost-model oracle that passes query for tuning decisions.
//!
//! A heuristic maps named features (for example `loopBodySize`) to a
//! number. The formula behind a heuristic is opaque to the passes; they only
//! see the evaluated and clamped result.

use anyhow::Result;
use parking_lot::Mutex;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type ValueMap = BTreeMap<String, f64>;

pub const UNROLLING_NUMBER: &str = "UnrollingOptimizer_unrollingNumber";

/// Formula behind a heuristic.
pub trait Formula: Send + Sync {
    fn eval(&self, features: &ValueMap) -> f64;
    fn is_constant(&self) -> bool {
        false
    }
}

/// Formula that ignores the features.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constant(pub f64);

impl Formula for Constant {
    fn eval(&self, _features: &ValueMap) -> f64 {
        self.0
    }
    fn is_constant(&self) -> bool {
        true
    }
}

impl<F> Formula for F
where
    F: Fn(&ValueMap) -> f64 + Send + Sync,
{
    fn eval(&self, features: &ValueMap) -> f64 {
        self(features)
    }
}

pub struct Heuristic {
    formula: Arc<dyn Formula>,
    min: f64,
    max: f64,
    uses: usize,
    too_low: usize,
    too_high: usize,
    features: BTreeSet<String>,
}

impl fmt::Debug for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heuristic")
            .field("constant", &self.formula.is_constant())
            .field("min", &self.min)
            .field("max", &self.max)
            .field("uses", &self.uses)
            .finish()
    }
}

impl Heuristic {
    pub fn new(formula: Arc<dyn Formula>) -> Self {
        Heuristic {
            formula,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            uses: 0,
            too_low: 0,
            too_high: 0,
            features: BTreeSet::new(),
        }
    }
    pub fn constant(value: f64) -> Self {
        Heuristic::new(Arc::new(Constant(value)))
    }
    pub fn min(&self) -> f64 {
        self.min
    }
    pub fn max(&self) -> f64 {
        self.max
    }
    pub fn set_min(&mut self, min: f64) {
        self.min = min;
    }
    pub fn set_max(&mut self, max: f64) {
        self.max = max;
    }
    pub fn uses(&self) -> usize {
        self.uses
    }
    pub fn too_low(&self) -> usize {
        self.too_low
    }
    pub fn too_high(&self) -> usize {
        self.too_high
    }
    /// Names of all features that this heuristic was evaluated with.
    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }
    fn record_use(&mut self, features: &ValueMap) {
        self.uses += 1;
        self.features.extend(features.keys().cloned());
    }
    fn clamp(&mut self, value: f64) -> f64 {
        if value < self.min {
            self.too_low += 1;
            self.min
        } else if value > self.max {
            self.too_high += 1;
            self.max
        } else {
            value
        }
    }
    /// Evaluate and clamp the result to the bounds.
    pub fn eval_double(&mut self, features: &ValueMap) -> f64 {
        self.record_use(features);
        let value = self.formula.eval(features);
        self.clamp(value)
    }
    pub fn eval_int(&mut self, features: &ValueMap) -> i64 {
        self.record_use(features);
        let value = self.formula.eval(features).round();
        self.clamp(value) as i64
    }
    /// Evaluate without bounds; any nonzero result is true.
    pub fn eval_bool(&mut self, features: &ValueMap) -> bool {
        self.record_use(features);
        self.formula.eval(features) != 0.0
    }
}

pub type HeuristicPtr = Arc<Mutex<Heuristic>>;

/// Registry of the heuristics of one compilation.
///
/// Every heuristic has a default formula. A configured override wins over
/// the default unless [HeuristicManager::use_default_heuristics] is set.
#[derive(Default)]
pub struct HeuristicManager {
    defaults: RwLock<BTreeMap<String, HeuristicPtr>>,
    overrides: RwLock<BTreeMap<String, HeuristicPtr>>,
    used: RwLock<BTreeMap<String, HeuristicPtr>>,
    use_defaults: RwLock<bool>,
}

impl HeuristicManager {
    pub fn new() -> Self {
        HeuristicManager::default()
    }
    /// Manager with the defaults of the passes in this crate.
    ///
    /// Loops are not unrolled unless an override raises the unroll factor.
    pub fn with_defaults() -> Self {
        let manager = HeuristicManager::new();
        manager.register_default(UNROLLING_NUMBER, Arc::new(Constant(1.0)));
        manager.set_default_bounds(UNROLLING_NUMBER, 1.0, 16.0);
        manager
    }
    pub fn register_default(&self, name: &str, formula: Arc<dyn Formula>) {
        let heuristic = Arc::new(Mutex::new(Heuristic::new(formula)));
        self.defaults.write().insert(name.to_string(), heuristic);
    }
    fn set_default_bounds(&self, name: &str, min: f64, max: f64) {
        if let Some(heuristic) = self.defaults.read().get(name) {
            let mut heuristic = heuristic.lock();
            heuristic.set_min(min);
            heuristic.set_max(max);
        }
    }
    /// Replace the formula of a heuristic.
    ///
    /// The bounds of the default heuristic, if any, carry over.
    pub fn set_override(&self, name: &str, formula: Arc<dyn Formula>) {
        let mut heuristic = Heuristic::new(formula);
        if let Some(default) = self.defaults.read().get(name) {
            let default = default.lock();
            heuristic.set_min(default.min());
            heuristic.set_max(default.max());
        }
        debug!("Override for heuristic {name}");
        let heuristic = Arc::new(Mutex::new(heuristic));
        self.overrides.write().insert(name.to_string(), heuristic);
    }
    pub fn use_default_heuristics(&self, use_defaults: bool) {
        *self.use_defaults.write() = use_defaults;
    }
    fn lookup(&self, name: &str) -> Result<HeuristicPtr> {
        if !*self.use_defaults.read() {
            if let Some(heuristic) = self.overrides.read().get(name) {
                return Ok(heuristic.clone());
            }
        }
        match self.defaults.read().get(name) {
            Some(heuristic) => Ok(heuristic.clone()),
            None => Err(anyhow::anyhow!("Unknown heuristic: {name}")),
        }
    }
    pub fn get_heuristic(&self, name: &str) -> Result<HeuristicPtr> {
        let heuristic = self.lookup(name)?;
        self.used
            .write()
            .insert(name.to_string(), heuristic.clone());
        Ok(heuristic)
    }
    pub fn set_min(&self, name: &str, min: f64) -> Result<()> {
        self.lookup(name)?.lock().set_min(min);
        Ok(())
    }
    pub fn set_max(&self, name: &str, max: f64) -> Result<()> {
        self.lookup(name)?.lock().set_max(max);
        Ok(())
    }
    /// Names of the heuristics that were requested so far.
    pub fn used_heuristics(&self) -> Vec<String> {
        self.used.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(size: f64) -> ValueMap {
        let mut features = ValueMap::new();
        features.insert("loopBodySize".to_string(), size);
        features
    }

    #[test]
    fn test_bounds() {
        let mut heuristic = Heuristic::new(Arc::new(|f: &ValueMap| f["loopBodySize"] * 10.0));
        heuristic.set_min(1.0);
        heuristic.set_max(16.0);
        assert_eq!(heuristic.eval_int(&features(1.0)), 10);
        assert_eq!(heuristic.eval_int(&features(4.0)), 16);
        assert_eq!(heuristic.eval_double(&features(0.0)), 1.0);
        assert!(heuristic.eval_bool(&features(0.5)));
        assert_eq!(heuristic.uses(), 4);
        assert_eq!(heuristic.too_high(), 1);
        assert_eq!(heuristic.too_low(), 1);
        assert!(heuristic.features().contains("loopBodySize"));
    }

    #[test]
    fn test_manager() {
        let manager = HeuristicManager::with_defaults();
        let heuristic = manager.get_heuristic(UNROLLING_NUMBER).unwrap();
        assert_eq!(heuristic.lock().eval_int(&ValueMap::new()), 1);

        manager.set_override(UNROLLING_NUMBER, Arc::new(Constant(64.0)));
        let heuristic = manager.get_heuristic(UNROLLING_NUMBER).unwrap();
        // Bounds of the default carry over to the override.
        assert_eq!(heuristic.lock().eval_int(&ValueMap::new()), 16);

        manager.use_default_heuristics(true);
        let heuristic = manager.get_heuristic(UNROLLING_NUMBER).unwrap();
        assert_eq!(heuristic.lock().eval_int(&ValueMap::new()), 1);

        assert!(manager.get_heuristic("Missing").is_err());
        assert!(manager.set_max("Missing", 2.0).is_err());
        assert_eq!(manager.used_heuristics(), vec![UNROLLING_NUMBER.to_string()]);
    }

    #[test]
    fn test_manager_bounds() {
        let manager = HeuristicManager::with_defaults();
        manager.set_override(UNROLLING_NUMBER, Arc::new(Constant(6.0)));
        manager.set_max(UNROLLING_NUMBER, 4.0).unwrap();
        let heuristic = manager.get_heuristic(UNROLLING_NUMBER).unwrap();
        assert_eq!(heuristic.lock().eval_int(&ValueMap::new()), 4);

        manager.set_min(UNROLLING_NUMBER, 8.0).unwrap();
        manager.set_max(UNROLLING_NUMBER, 16.0).unwrap();
        assert_eq!(heuristic.lock().eval_int(&ValueMap::new()), 8);
        assert_eq!(heuristic.lock().too_high(), 1);
        assert_eq!(heuristic.lock().too_low(), 1);

        // The bounds were set on the override, not on the default.
        manager.use_default_heuristics(true);
        let default = manager.get_heuristic(UNROLLING_NUMBER).unwrap();
        assert_eq!(default.lock().max(), 16.0);
        assert_eq!(default.lock().min(), 1.0);
    }
}
