//! Generated people and a simulated repository serving them page by page.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use gridpage::{BackendCount, BackendFetch, ResultPage, SortDirection, SortOrder, Window};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Brian", "Carmen", "Dennis", "Edsger", "Frances", "Grace",
    "Guido", "Hedy", "Ken", "Linus", "Margaret", "Niklaus", "Radia", "Rob", "Sophie", "Tim",
    "Yukihiro",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Berners", "Dijkstra", "Hamilton", "Hopper", "Kernighan", "Knuth", "Lamarr",
    "Liskov", "Lovelace", "Matsumoto", "Perlman", "Pike", "Ritchie", "Rossum", "Thompson",
    "Torvalds", "Turing", "Wilson", "Wirth",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: usize,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
}

/// Generate `count` people; the same seed always yields the same people
pub fn generate_people(count: usize, seed: Option<u64>) -> Vec<Person> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    (1..=count)
        .map(|id| Person {
            id,
            first_name: FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())].to_string(),
            last_name: LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())].to_string(),
            age: rng.gen_range(18..=90),
        })
        .collect()
}

/// Name substring and age range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    pub name: Option<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
}

impl PersonFilter {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.min_age.is_none() && self.max_age.is_none()
    }
}

impl fmt::Display for PersonFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={};min={};max={}",
            self.name.as_deref().unwrap_or(""),
            self.min_age.map(|a| a.to_string()).unwrap_or_default(),
            self.max_age.map(|a| a.to_string()).unwrap_or_default()
        )
    }
}

pub fn matches(person: &Person, filter: &PersonFilter) -> bool {
    if let Some(name) = &filter.name {
        let needle = name.to_lowercase();
        if !person.first_name.to_lowercase().contains(&needle)
            && !person.last_name.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    filter.min_age.map_or(true, |min| person.age >= min)
        && filter.max_age.map_or(true, |max| person.age <= max)
}

/// Ascending order of two people by one field; unknown fields compare equal
pub fn compare_people(a: &Person, b: &Person, field: &str) -> Ordering {
    match field {
        "id" => a.id.cmp(&b.id),
        "first_name" => a.first_name.cmp(&b.first_name),
        "last_name" | "name" => a
            .last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name)),
        "age" => a.age.cmp(&b.age),
        _ => Ordering::Equal,
    }
}

/// Remote store stand-in with optional per-call latency
pub struct PersonRepository {
    people: Arc<Vec<Person>>,
    latency: Duration,
}

impl PersonRepository {
    pub fn new(people: Vec<Person>, latency: Duration) -> Self {
        Self {
            people: Arc::new(people),
            latency,
        }
    }

    fn select(&self, filter: Option<&PersonFilter>, sort: &[SortOrder]) -> Vec<Person> {
        let mut selected: Vec<Person> = self
            .people
            .iter()
            .filter(|p| filter.map_or(true, |f| matches(p, f)))
            .cloned()
            .collect();

        if !sort.is_empty() {
            selected.sort_by(|a, b| {
                sort.iter()
                    .map(|order| match order.direction {
                        SortDirection::Asc => compare_people(a, b, &order.field),
                        SortDirection::Desc => compare_people(a, b, &order.field).reverse(),
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        selected
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl BackendFetch<Person, PersonFilter> for PersonRepository {
    async fn fetch_page(
        &self,
        filter: Option<&PersonFilter>,
        window: Window,
        sort: &[SortOrder],
    ) -> anyhow::Result<ResultPage<Person>> {
        self.simulate_latency().await;
        let selected = self.select(filter, sort);
        trace!(
            "Repository page {}+{} of {} people",
            window.offset,
            window.limit,
            selected.len()
        );
        Ok(ResultPage::new(window.slice(&selected).to_vec(), selected.len()))
    }
}

#[async_trait]
impl BackendCount<PersonFilter> for PersonRepository {
    async fn count(&self, filter: Option<&PersonFilter>, _sort: &[SortOrder]) -> anyhow::Result<usize> {
        self.simulate_latency().await;
        Ok(self
            .people
            .iter()
            .filter(|p| filter.map_or(true, |f| matches(p, f)))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_generation_is_repeatable() {
        let first = generate_people(50, Some(7));
        assert_eq!(first, generate_people(50, Some(7)));
        assert_eq!(first.len(), 50);
        assert!(first.iter().all(|p| (18..=90).contains(&p.age)));
    }

    #[test]
    fn test_filter_rendering() {
        let filter = PersonFilter {
            name: Some("ada".into()),
            min_age: Some(30),
            max_age: None,
        };
        assert_eq!(filter.to_string(), "name=ada;min=30;max=");
        assert!(PersonFilter::default().is_empty());
    }

    #[tokio::test]
    async fn test_repository_filters_sorts_and_slices() {
        let repo = PersonRepository::new(generate_people(200, Some(1)), Duration::ZERO);
        let filter = PersonFilter {
            min_age: Some(40),
            ..PersonFilter::default()
        };
        let sort = vec![SortOrder::desc("age"), SortOrder::asc("id")];

        let page = repo
            .fetch_page(Some(&filter), Window { offset: 0, limit: 10 }, &sort)
            .await
            .unwrap();
        let total = repo.count(Some(&filter), &sort).await.unwrap();

        assert_eq!(page.total_count, total);
        assert!(page.items.len() <= 10);
        assert!(page.items.iter().all(|p| p.age >= 40));
        assert!(page.items.windows(2).all(|w| w[0].age >= w[1].age));
    }
}
