// costs.rs - Spending overview across a user's builds

use database::{
    builds::model::{BuildProjectModel, BuildStatus},
    steps::model::{BuildStepModel, StepType},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCost {
    pub project_id: String,
    pub name: String,
    pub status: BuildStatus,
    pub budget: Option<f64>,
    pub spent: f64,
    pub remaining: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTypeCost {
    pub step_type: StepType,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOverview {
    pub total_spent: f64,
    pub total_budget: f64,
    pub project_count: usize,
    pub projects: Vec<ProjectCost>,
    pub by_step_type: Vec<StepTypeCost>,
}

/// Folds projects and their steps into per-project and per-step-type totals.
///
/// Spending is computed from the steps themselves rather than the stored project
/// summaries. Steps without a cost still count towards their type, steps whose
/// project is not listed are ignored. Step types are ordered by total, largest
/// first, ties broken by name.
pub fn summarize_costs(projects: &[BuildProjectModel], steps: &[BuildStepModel]) -> CostOverview {
    let known: HashSet<_> = projects.iter().filter_map(|project| project.id).collect();
    let mut spent_by_project: HashMap<_, f64> = HashMap::new();
    let mut by_type: BTreeMap<StepType, (f64, i64)> = BTreeMap::new();

    for step in steps.iter().filter(|step| known.contains(&step.project_id)) {
        let cost = step.cost.unwrap_or(0.0);
        *spent_by_project.entry(step.project_id).or_default() += cost;

        let entry = by_type.entry(step.step_type).or_default();
        entry.0 += cost;
        entry.1 += 1;
    }

    let project_costs: Vec<ProjectCost> = projects
        .iter()
        .map(|project| {
            let spent = project
                .id
                .and_then(|id| spent_by_project.get(&id).copied())
                .unwrap_or(0.0);

            ProjectCost {
                project_id: project.id.map(|id| id.to_hex()).unwrap_or_default(),
                name: project.name.clone(),
                status: project.status,
                budget: project.budget,
                spent,
                remaining: project.budget.map(|budget| budget - spent),
            }
        })
        .collect();

    let mut by_step_type: Vec<StepTypeCost> = by_type
        .into_iter()
        .map(|(step_type, (total, count))| StepTypeCost {
            step_type,
            total,
            count,
        })
        .collect();
    by_step_type.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.step_type.as_str().cmp(b.step_type.as_str()))
    });

    CostOverview {
        total_spent: project_costs.iter().map(|project| project.spent).sum(),
        total_budget: projects.iter().filter_map(|project| project.budget).sum(),
        project_count: projects.len(),
        projects: project_costs,
        by_step_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{oid::ObjectId, DateTime};
    use pretty_assertions::assert_eq;

    fn project(owner: ObjectId, name: &str, budget: Option<f64>) -> BuildProjectModel {
        let mut project = BuildProjectModel::new(owner, name, DateTime::now());
        project.id = Some(ObjectId::new());
        project.budget = budget;
        project
    }

    fn step(project: &BuildProjectModel, step_type: StepType, cost: Option<f64>) -> BuildStepModel {
        let mut step = BuildStepModel::new(
            project.id.unwrap(),
            project.owner,
            step_type,
            DateTime::now(),
        );
        step.cost = cost;
        step
    }

    #[test]
    fn test_empty_overview() {
        let overview = summarize_costs(&[], &[]);

        assert_eq!(overview.total_spent, 0.0);
        assert_eq!(overview.project_count, 0);
        assert!(overview.by_step_type.is_empty());
    }

    #[test]
    fn test_overview_totals_per_project_and_type() {
        let owner = ObjectId::new();
        let house = project(owner, "House", Some(300_000.0));
        let garage = project(owner, "Garage", None);

        let steps = vec![
            step(&house, StepType::Foundation, Some(40_000.0)),
            step(&house, StepType::Framing, Some(55_000.0)),
            step(&house, StepType::Inspection, None),
            step(&garage, StepType::Foundation, Some(8_000.0)),
        ];

        let overview = summarize_costs(&[house.clone(), garage.clone()], &steps);

        assert_eq!(overview.project_count, 2);
        assert_eq!(overview.total_spent, 103_000.0);
        assert_eq!(overview.total_budget, 300_000.0);

        let house_cost = &overview.projects[0];
        assert_eq!(house_cost.spent, 95_000.0);
        assert_eq!(house_cost.remaining, Some(205_000.0));
        assert_eq!(overview.projects[1].remaining, None);

        let types: Vec<(StepType, f64, i64)> = overview
            .by_step_type
            .iter()
            .map(|entry| (entry.step_type, entry.total, entry.count))
            .collect();
        assert_eq!(
            types,
            vec![
                (StepType::Framing, 55_000.0, 1),
                (StepType::Foundation, 48_000.0, 2),
                (StepType::Inspection, 0.0, 1),
            ]
        );
    }

    #[test]
    fn test_equal_totals_are_ordered_by_name() {
        let owner = ObjectId::new();
        let house = project(owner, "House", None);
        let steps = vec![
            step(&house, StepType::Roofing, Some(100.0)),
            step(&house, StepType::Painting, Some(100.0)),
        ];

        let overview = summarize_costs(&[house], &steps);
        assert_eq!(overview.by_step_type[0].step_type, StepType::Painting);
        assert_eq!(overview.by_step_type[1].step_type, StepType::Roofing);
    }

    #[test]
    fn test_over_budget_project_has_negative_remaining() {
        let owner = ObjectId::new();
        let shed = project(owner, "Shed", Some(1_000.0));
        let steps = vec![step(&shed, StepType::Framing, Some(1_250.0))];

        let overview = summarize_costs(&[shed], &steps);
        assert_eq!(overview.projects[0].remaining, Some(-250.0));
    }

    #[test]
    fn test_steps_of_unlisted_projects_are_ignored() {
        let owner = ObjectId::new();
        let house = project(owner, "House", None);
        // Left behind by a step created while its build was being deleted
        let deleted = project(owner, "Deleted", None);

        let steps = vec![
            step(&house, StepType::Framing, Some(500.0)),
            step(&deleted, StepType::Framing, Some(9_000.0)),
            step(&deleted, StepType::Roofing, Some(1_000.0)),
        ];

        let overview = summarize_costs(&[house], &steps);
        assert_eq!(overview.total_spent, 500.0);
        assert_eq!(
            overview.by_step_type,
            vec![StepTypeCost {
                step_type: StepType::Framing,
                total: 500.0,
                count: 1,
            }]
        );
    }
}
