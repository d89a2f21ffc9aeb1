///! Gallery state
///!
///! Owns the rendered units, the per-unit cycle positions and the two-pass
///! lifecycle: every bird is shown with its placeholder first, then the
///! images are resolved in the background and patched in one by one.

use super::filter::{FilterController, Visibility};
use super::renderer::{
    render_page, CardRenderer, CardView, DisplayUnit, PageView, SectionView, UnitStatus,
};
use super::resolver::ImageResolver;
use crate::config::GalleryConfig;
use crate::model::{Catalog, CatalogEntry};
use aviary_common::ImageCandidate;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Outcome of one background resolution pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    pub total_birds: usize,
    pub resolved: usize,
    pub placeholders: usize,
    pub duration_seconds: f64,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Counts by status, for the status line and `/api/units`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub resolved: usize,
    pub placeholder: usize,
    pub pending: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

/// Current cycle position per unit id; absent means 0
#[derive(Debug, Default)]
pub struct CycleState {
    positions: HashMap<String, usize>,
}

impl CycleState {
    pub fn current(&self, id: &str) -> usize {
        self.positions.get(id).copied().unwrap_or(0)
    }

    /// Step to the next candidate, wrapping at `len`
    pub fn advance(&mut self, id: &str, len: usize) -> usize {
        let next = if len == 0 {
            0
        } else {
            (self.current(id) + 1) % len
        };
        self.positions.insert(id.to_string(), next);
        next
    }

    pub fn reset(&mut self, id: &str) {
        self.positions.remove(id);
    }
}

/// A unit plus what is currently shown for it
#[derive(Debug, Clone, Serialize)]
pub struct UnitSnapshot {
    #[serde(flatten)]
    pub unit: DisplayUnit,
    pub current_index: usize,
    pub current: ImageCandidate,
}

#[derive(Debug)]
struct Section {
    name: String,
    id: String,
    unit_ids: Vec<String>,
}

pub struct Gallery {
    title: Option<String>,
    description: Option<String>,
    sections: Vec<Section>,
    entries: Vec<CatalogEntry>,
    renderer: CardRenderer,
    filter: FilterController,
    units: RwLock<Vec<DisplayUnit>>,
    index: HashMap<String, usize>,
    cycles: RwLock<CycleState>,
    last_report: RwLock<Option<ResolutionReport>>,
}

impl Gallery {
    /// First pass: every bird rendered with its placeholder
    pub fn new(catalog: &Catalog, renderer: CardRenderer, filter: FilterController) -> Self {
        let entries = catalog.entries();
        let units: Vec<DisplayUnit> = entries
            .iter()
            .map(|entry| renderer.render_pending(entry))
            .collect();
        let index = units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.id.clone(), i))
            .collect();

        let mut sections: Vec<Section> = catalog
            .categories
            .iter()
            .map(|category| Section {
                name: category.name.clone(),
                id: category.id.clone(),
                unit_ids: Vec::new(),
            })
            .collect();
        for entry in &entries {
            if let Some(section) = sections.iter_mut().find(|s| s.id == entry.section) {
                section.unit_ids.push(entry.id.clone());
            }
        }

        tracing::info!(
            "Gallery ready: {} birds in {} categories",
            units.len(),
            sections.len()
        );

        Self {
            title: catalog.title.clone(),
            description: catalog.description.clone(),
            sections,
            entries,
            renderer,
            filter,
            units: RwLock::new(units),
            index,
            cycles: RwLock::new(CycleState::default()),
            last_report: RwLock::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Second pass: resolve every bird and patch its unit as soon as it is done.
    ///
    /// At most `concurrency` resolutions run at once and starts are spaced
    /// `request_delay_ms` apart.
    pub async fn resolve_all(&self, resolver: &ImageResolver, config: &GalleryConfig) -> ResolutionReport {
        let started = Instant::now();
        let schedule = tokio::time::Instant::now();
        let delay = Duration::from_millis(config.request_delay_ms);

        let mut report = ResolutionReport {
            total_birds: self.entries.len(),
            ..ResolutionReport::default()
        };

        let mut results = stream::iter(self.entries.iter().enumerate())
            .map(|(i, entry)| async move {
                if i > 0 && !delay.is_zero() {
                    let offset = start_offset(delay, i);
                    match schedule.checked_add(offset) {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => tokio::time::sleep(offset).await,
                    }
                }
                let candidates = resolver.resolve(&entry.bird).await;
                (entry, candidates)
            })
            .buffer_unordered(config.concurrency.max(1))
            .boxed();

        while let Some((entry, candidates)) = results.next().await {
            let unit = self.renderer.render(entry, candidates);
            match unit.status {
                UnitStatus::Resolved => report.resolved += 1,
                _ => report.placeholders += 1,
            }
            self.apply(unit).await;
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        report.finished_at = Some(Utc::now());
        tracing::info!(
            "Image resolution finished: {}/{} resolved, {} placeholders, {:.1}s",
            report.resolved,
            report.total_birds,
            report.placeholders,
            report.duration_seconds
        );
        *self.last_report.write().await = Some(report.clone());
        report
    }

    /// Report of the most recent finished resolution pass
    pub async fn last_report(&self) -> Option<ResolutionReport> {
        self.last_report.read().await.clone()
    }

    /// Replace a unit in place; its cycle restarts at the first image
    async fn apply(&self, unit: DisplayUnit) {
        let Some(&slot) = self.index.get(&unit.id) else {
            tracing::warn!("Resolved unknown unit {}", unit.id);
            return;
        };
        self.cycles.write().await.reset(&unit.id);
        let mut units = self.units.write().await;
        tracing::debug!(
            "Unit {} -> {} image(s) ({:?})",
            unit.id,
            unit.candidates.len(),
            unit.status
        );
        units[slot] = unit;
    }

    /// Cycle `id` to its next image; `None` for unknown ids
    pub async fn advance(&self, id: &str) -> Option<usize> {
        let slot = *self.index.get(id)?;
        let len = self.units.read().await[slot].candidates.len();
        Some(self.cycles.write().await.advance(id, len))
    }

    pub async fn unit(&self, id: &str) -> Option<UnitSnapshot> {
        let slot = *self.index.get(id)?;
        let unit = self.units.read().await[slot].clone();
        let current_index = self.cycles.read().await.current(id);
        Some(Self::snapshot_of(unit, current_index))
    }

    pub async fn snapshot(&self) -> Vec<UnitSnapshot> {
        let units = self.units.read().await;
        let cycles = self.cycles.read().await;
        units
            .iter()
            .map(|unit| Self::snapshot_of(unit.clone(), cycles.current(&unit.id)))
            .collect()
    }

    fn snapshot_of(unit: DisplayUnit, current_index: usize) -> UnitSnapshot {
        let current = unit.image_at(current_index).clone();
        UnitSnapshot {
            current_index,
            current,
            unit,
        }
    }

    pub async fn progress(&self) -> Progress {
        let units = self.units.read().await;
        let mut progress = Progress {
            total: units.len(),
            ..Progress::default()
        };
        for unit in units.iter() {
            match unit.status {
                UnitStatus::Resolved => progress.resolved += 1,
                UnitStatus::Placeholder => progress.placeholder += 1,
                UnitStatus::Pending => progress.pending += 1,
            }
        }
        progress
    }

    pub async fn visibility(&self, query: &str) -> Visibility {
        let units = self.units.read().await;
        self.filter.on_query_change(query, units.iter())
    }

    /// Full page with `query` already applied
    pub async fn page_html(&self, query: &str) -> String {
        let units = self.units.read().await;
        let cycles = self.cycles.read().await;
        let visibility = self.filter.on_query_change(query, units.iter());

        let mut progress = Progress {
            total: units.len(),
            ..Progress::default()
        };
        for unit in units.iter() {
            if unit.status == UnitStatus::Pending {
                progress.pending += 1;
            }
        }

        let sections = self
            .sections
            .iter()
            .map(|section| SectionView {
                name: &section.name,
                slug: section.id.clone(),
                visible: visibility.category_visible(&section.id),
                cards: section
                    .unit_ids
                    .iter()
                    .filter_map(|id| self.index.get(id).map(|&slot| &units[slot]))
                    .map(|unit| CardView {
                        unit,
                        index: cycles.current(&unit.id),
                        visible: visibility.unit_visible(&unit.id),
                        query,
                    })
                    .collect(),
            })
            .collect();

        render_page(&PageView {
            title: self.title.as_deref(),
            description: self.description.as_deref(),
            query,
            status_line: status_line(&visibility, &progress),
            sections,
        })
    }
}

/// Delay before the `i`th resolution may start; saturates instead of overflowing
fn start_offset(delay: Duration, i: usize) -> Duration {
    delay.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX))
}

fn status_line(visibility: &Visibility, progress: &Progress) -> String {
    let mut line = if visibility.query.is_empty() {
        format!("{} birds", progress.total)
    } else {
        format!(
            "{} of {} birds match \"{}\"",
            visibility.visible_count, progress.total, visibility.query
        )
    };
    if progress.pending > 0 {
        line.push_str(&format!(" · loading images ({} remaining)", progress.pending));
    }
    line
}
