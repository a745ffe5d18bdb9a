//! Chart engine store
//!
//! Chart definitions only; drawing them is left to whatever visualization
//! library the front end uses.

use serde::{Deserialize, Serialize};

use crate::core::{
    codec, Collection, Holds, Patch, PersistentStore, Record, StoreError, StoreState,
};

/// Kind of chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    Graph,
    Scene3d,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Graph => "graph",
            ChartKind::Scene3d => "scene3d",
        }
    }
}

/// One labelled value of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

/// A named data series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub points: Vec<DataPoint>,
}

/// A chart definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    #[serde(default)]
    pub series: Vec<Series>,
    /// Document the chart visualizes
    #[serde(default)]
    pub source_document: Option<String>,
}

impl Chart {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            series: Vec::new(),
            source_document: None,
        }
    }

    /// Total number of data points across all series
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|series| series.points.len()).sum()
    }
}

impl Record for Chart {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial update for a [`Chart`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartPatch {
    pub title: Option<String>,
    pub kind: Option<ChartKind>,
    pub series: Option<Vec<Series>>,
    pub source_document: Option<Option<String>>,
}

impl Patch<Chart> for ChartPatch {
    fn apply(self, record: &mut Chart) -> Result<(), StoreError> {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(series) = self.series {
            record.series = series;
        }
        if let Some(source_document) = self.source_document {
            record.source_document = source_document;
        }
        Ok(())
    }
}

/// State of the chart engine store
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartState {
    #[serde(with = "codec::pairs")]
    pub charts: Collection<Chart>,
    pub current_chart: Option<String>,
}

impl StoreState for ChartState {}

impl Holds<Chart> for ChartState {
    fn collection(&self) -> &Collection<Chart> {
        &self.charts
    }

    fn collection_mut(&mut self) -> &mut Collection<Chart> {
        &mut self.charts
    }

    fn selected(&self) -> Option<&str> {
        self.current_chart.as_deref()
    }

    fn select(&mut self, key: Option<String>) -> bool {
        self.current_chart = key;
        true
    }
}

/// Store of chart definitions
pub type ChartStore = PersistentStore<ChartState>;
