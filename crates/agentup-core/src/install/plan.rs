//! Recipe selection helpers: recommendation filtering, dependency resolution
//! and install ordering.

use std::collections::{HashMap, HashSet};

use crate::config::BundleSettings;
use crate::types::{DiscoveryManifest, Recipe};

/// Keep recommendations that target this host and are not already part of
/// the run. Fetch order is preserved.
pub(crate) fn eligible_recommendations(
    recommendations: Vec<Recipe>,
    manifest: &DiscoveryManifest,
    taken: &HashSet<String>,
) -> Vec<Recipe> {
    let mut seen: HashSet<String> = taken.clone();
    recommendations
        .into_iter()
        .filter(|recipe| {
            if !recipe.matches_manifest(manifest) {
                tracing::debug!(recipe = %recipe.name, "recommendation does not target this host");
                return false;
            }
            if !seen.insert(recipe.name.clone()) {
                tracing::debug!(recipe = %recipe.name, "duplicate recommendation dropped");
                return false;
            }
            true
        })
        .collect()
}

/// Declared dependencies plus the infra agent when it is the root of every
/// install.
pub(crate) fn effective_dependencies<'a>(
    recipe: &'a Recipe,
    bundle: &'a BundleSettings,
) -> Vec<&'a str> {
    let mut deps: Vec<&str> = Vec::with_capacity(recipe.dependencies.len() + 1);
    if bundle.infra_is_root && recipe.name != bundle.infra_agent {
        deps.push(bundle.infra_agent.as_str());
    }
    for dep in &recipe.dependencies {
        if dep != &recipe.name && !deps.contains(&dep.as_str()) {
            deps.push(dep.as_str());
        }
    }
    deps
}

/// Stable dependency ordering: each recipe keeps its position unless one of
/// its dependencies in the queue would otherwise run after it. Cycles are
/// broken at the back edge.
pub(crate) fn install_order(queue: Vec<Recipe>, bundle: &BundleSettings) -> Vec<Recipe> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, recipe) in queue.iter().enumerate() {
        index.entry(recipe.name.as_str()).or_insert(i);
    }

    let mut sorter = Sorter {
        queue: &queue,
        bundle,
        index: &index,
        placed: vec![false; queue.len()],
        visiting: vec![false; queue.len()],
        order: Vec::with_capacity(queue.len()),
    };
    for i in 0..queue.len() {
        sorter.visit(i);
    }
    let order = sorter.order;

    let mut slots: Vec<Option<Recipe>> = queue.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

struct Sorter<'a> {
    queue: &'a [Recipe],
    bundle: &'a BundleSettings,
    index: &'a HashMap<&'a str, usize>,
    placed: Vec<bool>,
    visiting: Vec<bool>,
    order: Vec<usize>,
}

impl Sorter<'_> {
    fn visit(&mut self, i: usize) {
        if self.placed[i] || self.visiting[i] {
            return;
        }
        self.visiting[i] = true;
        for dep in effective_dependencies(&self.queue[i], self.bundle) {
            if let Some(&j) = self.index.get(dep) {
                self.visit(j);
            }
        }
        self.visiting[i] = false;
        self.placed[i] = true;
        self.order.push(i);
    }
}

/// Split recommendations into (chosen, declined) by the labels picked in the
/// multi-select prompt. Duplicate labels are matched in order.
pub(crate) fn split_by_labels(
    recommendations: Vec<Recipe>,
    chosen: &[String],
) -> (Vec<Recipe>, Vec<Recipe>) {
    let mut remaining: Vec<&str> = chosen.iter().map(String::as_str).collect();
    recommendations.into_iter().partition(|recipe| {
        match remaining.iter().position(|label| *label == recipe.label()) {
            Some(pos) => {
                remaining.remove(pos);
                true
            }
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstallTarget, InstallTargetType};

    fn names(recipes: &[Recipe]) -> Vec<&str> {
        recipes.iter().map(|r| r.name.as_str()).collect()
    }

    fn depending(name: &str, deps: &[&str]) -> Recipe {
        Recipe {
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..Recipe::named(name)
        }
    }

    #[test]
    fn recommendations_filtered_by_target_and_dupes() {
        let mut app = Recipe::named("b");
        app.install_targets = vec![InstallTarget::of_type(InstallTargetType::Application)];
        let recs = vec![
            Recipe::named("a"),
            app,
            Recipe::named("infra"),
            Recipe::named("a"),
            Recipe::named("c"),
        ];
        let taken = HashSet::from(["infra".to_string()]);

        let eligible = eligible_recommendations(recs, &DiscoveryManifest::default(), &taken);
        assert_eq!(names(&eligible), ["a", "c"]);
    }

    #[test]
    fn infra_is_implicit_root() {
        let bundle = BundleSettings {
            infra_agent: "infra".to_string(),
            ..BundleSettings::default()
        };
        let recipe = depending("mysql", &["infra", "mysql", "logs"]);
        assert_eq!(effective_dependencies(&recipe, &bundle), ["infra", "logs"]);
        assert!(effective_dependencies(&Recipe::named("infra"), &bundle).is_empty());

        let flat = BundleSettings {
            infra_is_root: false,
            ..bundle
        };
        assert_eq!(effective_dependencies(&recipe, &flat), ["infra", "logs"]);
        assert!(effective_dependencies(&Recipe::named("php"), &flat).is_empty());
    }

    #[test]
    fn order_moves_dependencies_forward_only_when_needed() {
        let bundle = BundleSettings {
            infra_agent: "infra".to_string(),
            ..BundleSettings::default()
        };
        let queue = vec![
            Recipe::named("infra"),
            depending("app", &["db"]),
            Recipe::named("web"),
            Recipe::named("db"),
        ];
        let ordered = install_order(queue, &bundle);
        assert_eq!(names(&ordered), ["infra", "db", "app", "web"]);
    }

    #[test]
    fn order_survives_cycles() {
        let bundle = BundleSettings {
            infra_is_root: false,
            ..BundleSettings::default()
        };
        let queue = vec![depending("a", &["b"]), depending("b", &["a"])];
        let ordered = install_order(queue, &bundle);
        assert_eq!(names(&ordered), ["b", "a"]);
    }

    #[test]
    fn labels_select_recommendations() {
        let mut mysql = Recipe::named("mysql");
        mysql.display_name = "MySQL".to_string();
        let recs = vec![mysql, Recipe::named("redis"), Recipe::named("nginx")];

        let (chosen, declined) =
            split_by_labels(recs, &["MySQL".to_string(), "nginx".to_string()]);
        assert_eq!(names(&chosen), ["mysql", "nginx"]);
        assert_eq!(names(&declined), ["redis"]);
    }
}
