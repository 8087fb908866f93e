use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use gridpage::{
    BackendPagedCache, CacheStats, DataSource, GridConfig, GridView, ListSource, PageButton,
    PageRange, PaginationController, PaginationState, QueryKeyCodec, SortOrder,
};

use super::people::{compare_people, generate_people, matches, Person, PersonFilter, PersonRepository};

/// Page through a generated list of people
#[derive(Debug, Args)]
pub struct DemoCommand {
    /// Number of people to generate
    #[arg(long, default_value_t = 1000)]
    pub people: usize,

    /// Seed for repeatable data
    #[arg(long)]
    pub seed: Option<u64>,

    /// Page to show (1-based)
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Page size; offered as an extra option if not configured
    #[arg(short = 's', long)]
    pub page_size: Option<usize>,

    /// Only people whose first or last name contains this text
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub min_age: Option<u32>,

    #[arg(long)]
    pub max_age: Option<u32>,

    /// Sort criteria, primary first (field or field:asc|desc)
    #[arg(long = "sort")]
    pub sort: Vec<SortOrder>,

    /// Serve pages through the backend page cache
    #[arg(long)]
    pub backend: bool,

    /// Use the repository's count-only call when the count cache is cold
    #[arg(long, requires = "backend")]
    pub count_hook: bool,

    /// Simulated backend latency per call
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DemoReport {
    state: PaginationState,
    range: PageRange,
    page_size_options: Vec<usize>,
    buttons: Vec<PageButton>,
    items: Vec<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<CacheStats>,
}

impl DemoCommand {
    pub async fn execute(&self, config: &GridConfig) -> Result<()> {
        let people = generate_people(self.people, self.seed);
        info!("Generated {} people", people.len());

        let cache = self.backend.then(|| self.build_cache(config, people.clone()));
        let source: Arc<dyn DataSource<Person, PersonFilter>> = match &cache {
            Some(cache) => cache.clone(),
            None => Arc::new(
                ListSource::new(people)
                    .with_predicate(matches)
                    .with_comparator(compare_people),
            ),
        };

        let mut controller = PaginationController::with_config(config);
        controller.attach_source(source).await?;

        let filter = PersonFilter {
            name: self.name.clone(),
            min_age: self.min_age,
            max_age: self.max_age,
        };
        if !filter.is_empty() {
            controller.set_filter(Some(filter)).await?;
        }
        if !self.sort.is_empty() {
            controller.on_sort_change(self.sort.clone()).await?;
        }
        if let Some(size) = self.page_size {
            controller.register_page_size(size).await?;
        }
        controller.on_page_change(self.page).await?;

        let state = controller.state().await?;
        let items = match controller.view().await? {
            GridView::Paged(items) => items.as_ref().clone(),
            other => {
                debug!("Unexpected view: {:?}", other);
                Vec::new()
            }
        };

        let paginator = controller.paginator();
        let report = DemoReport {
            state,
            range: paginator.summary(),
            page_size_options: paginator.page_size_options(),
            buttons: paginator.page_buttons(),
            items,
            cache: cache.as_ref().map(|c| c.stats()),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report, paginator.show_summary_text());
        }
        Ok(())
    }

    fn build_cache(
        &self,
        config: &GridConfig,
        people: Vec<Person>,
    ) -> Arc<BackendPagedCache<Person, PersonFilter>> {
        let latency = Duration::from_millis(self.latency_ms);
        let codec = QueryKeyCodec::new().with_digest(config.key_digest);
        let cache = BackendPagedCache::with_codec(PersonRepository::new(people.clone(), latency), codec);

        let cache = if self.count_hook {
            cache.with_count_backend(PersonRepository::new(people, latency))
        } else {
            cache
        };
        Arc::new(cache)
    }
}

fn print_report(report: &DemoReport, show_summary: bool) {
    println!("{:>6}  {:<12} {:<12} {:>3}", "ID", "FIRST", "LAST", "AGE");
    for person in &report.items {
        println!(
            "{:>6}  {:<12} {:<12} {:>3}",
            person.id, person.first_name, person.last_name, person.age
        );
    }
    println!();

    let buttons: Vec<String> = report
        .buttons
        .iter()
        .map(|button| match button {
            PageButton::Page(page) if *page == report.state.page => format!("[{}]", page),
            PageButton::Page(page) => page.to_string(),
            PageButton::Gap => "...".to_string(),
        })
        .collect();
    println!("{}", buttons.join(" "));

    if show_summary {
        println!(
            "Page {} of {}, showing {} ({} per page)",
            report.state.page,
            report.state.total_pages.max(1),
            report.range,
            report.state.page_size
        );
    }

    if let Some(stats) = &report.cache {
        println!(
            "Cache: {} hits, {} misses, {} count hits, {} backend calls",
            stats.hits, stats.misses, stats.count_hits, stats.backend_calls
        );
    }
}
