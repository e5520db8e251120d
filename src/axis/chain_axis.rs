use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of combining functions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainMethod {
    #[default]
    Sum,
    Difference,
    Average,
    Product,
    Maximum,
    Minimum,
}

impl ChainMethod {
    pub const ALL: [ChainMethod; 6] = [
        ChainMethod::Sum,
        ChainMethod::Difference,
        ChainMethod::Average,
        ChainMethod::Product,
        ChainMethod::Maximum,
        ChainMethod::Minimum,
    ];

    pub fn apply(self, first: f32, second: f32) -> f32 {
        match self {
            ChainMethod::Sum => first + second,
            ChainMethod::Difference => first - second,
            ChainMethod::Average => (first + second) / 2.0,
            ChainMethod::Product => first * second,
            ChainMethod::Maximum => first.max(second),
            ChainMethod::Minimum => first.min(second),
        }
    }
}

impl fmt::Display for ChainMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainMethod::Sum => "Sum",
            ChainMethod::Difference => "Difference",
            ChainMethod::Average => "Average",
            ChainMethod::Product => "Product",
            ChainMethod::Maximum => "Maximum",
            ChainMethod::Minimum => "Minimum",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ChainMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainMethod::ALL
            .into_iter()
            .find(|method| method.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown chain method: {}", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DependencySlot {
    First,
    Second,
}

/// Combinator over up to two other axes, referenced by name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainAxis {
    pub method: ChainMethod,
    first: Option<String>,
    second: Option<String>,
}

impl ChainAxis {
    pub fn new(method: ChainMethod) -> Self {
        Self {
            method,
            first: None,
            second: None,
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.first.as_deref()
    }

    pub fn second(&self) -> Option<&str> {
        self.second.as_deref()
    }

    pub fn slot(&self, slot: DependencySlot) -> Option<&str> {
        match slot {
            DependencySlot::First => self.first(),
            DependencySlot::Second => self.second(),
        }
    }

    /// Named dependencies in slot order
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.first.as_deref().into_iter().chain(self.second.as_deref())
    }

    // Edges only change through the registry, which checks them for cycles
    pub(crate) fn set_slot(&mut self, slot: DependencySlot, target: Option<String>) {
        match slot {
            DependencySlot::First => self.first = target,
            DependencySlot::Second => self.second = target,
        }
    }

    pub(crate) fn rename_dependency(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for slot in [&mut self.first, &mut self.second] {
            if slot.as_deref() == Some(old) {
                *slot = Some(new.to_string());
                changed = true;
            }
        }
        changed
    }

    /// Combines the resolved dependency values, an unresolved side is left out
    pub fn combine(&self, first: Option<f32>, second: Option<f32>) -> f32 {
        match (first, second) {
            (Some(a), Some(b)) => self.method.apply(a, b),
            (Some(value), None) | (None, Some(value)) => value,
            (None, None) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_combine_both_inputs() {
        assert_eq!(ChainMethod::Sum.apply(0.5, 0.75), 1.25);
        assert_eq!(ChainMethod::Difference.apply(0.5, 0.75), -0.25);
        assert_eq!(ChainMethod::Average.apply(0.5, 0.75), 0.625);
        assert_eq!(ChainMethod::Product.apply(0.5, 0.75), 0.375);
        assert_eq!(ChainMethod::Maximum.apply(0.5, 0.75), 0.75);
        assert_eq!(ChainMethod::Minimum.apply(0.5, 0.75), 0.5);
    }

    #[test]
    fn missing_side_degrades_to_the_other() {
        let chain = ChainAxis::new(ChainMethod::Product);
        assert_eq!(chain.combine(Some(0.4), None), 0.4);
        assert_eq!(chain.combine(None, Some(-0.2)), -0.2);
        assert_eq!(chain.combine(None, None), 0.0);
    }

    #[test]
    fn method_names_round_trip() {
        for method in ChainMethod::ALL {
            assert_eq!(method.to_string().parse::<ChainMethod>(), Ok(method));
        }
        assert_eq!("average".parse::<ChainMethod>(), Ok(ChainMethod::Average));
        assert!("median".parse::<ChainMethod>().is_err());
    }

    #[test]
    fn rename_touches_every_matching_slot() {
        let mut chain = ChainAxis::new(ChainMethod::Sum);
        chain.set_slot(DependencySlot::First, Some("pitch".into()));
        chain.set_slot(DependencySlot::Second, Some("pitch".into()));

        assert!(chain.rename_dependency("pitch", "elevator"));
        assert_eq!(chain.dependencies().collect::<Vec<_>>(), ["elevator", "elevator"]);
        assert!(!chain.rename_dependency("pitch", "roll"));
    }
}
