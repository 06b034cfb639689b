//! 📊 Reports: what happened to each object, and to the invocation as a whole.
//!
//! Every counter here corresponds to one of the pipeline's named outcomes. A
//! skipped datum, a string that refused to become a float, a record with no id:
//! none of them are errors, all of them get counted. Then the CLI prints a
//! table so comfy it has lumbar support.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};

/// 📋 The ledger for a single object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectReport {
    pub locator: String,
    /// 🧬 records that came out of the decoder as records
    pub decoded: usize,
    /// 🗑️ datums the decoder could not turn into records
    pub skipped: usize,
    /// 🚫 records left out of a payload for lack of an id
    pub dropped: usize,
    pub unwrapped: usize,
    pub coerced: usize,
    pub left_as_string: usize,
    /// 📦 batches handed to the sink, successful or not
    pub batches: usize,
    pub batches_failed: usize,
    /// 🔌 failed batches that never got an HTTP answer at all
    pub unreachable: usize,
    pub dispatch_errors: Vec<String>,
    /// 💀 the error that ended this object early, if one did
    pub fatal: Option<String>,
}

impl ObjectReport {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            ..Self::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        self.fatal.is_some() || self.batches_failed > 0
    }

    fn status(&self) -> &'static str {
        match (&self.fatal, self.batches_failed) {
            (Some(_), _) => "💀 failed",
            (None, 0) => "✅ ok",
            (None, _) => "⚠️ partial",
        }
    }
}

/// 📚 All the objects one invocation touched, in the order it touched them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationReport {
    pub objects: Vec<ObjectReport>,
}

impl InvocationReport {
    pub fn push(&mut self, report: ObjectReport) {
        self.objects.push(report);
    }

    /// 🚦 Any fatal object or any failed dispatch. Drives the CLI exit code.
    pub fn has_failures(&self) -> bool {
        self.objects.iter().any(ObjectReport::has_failures)
    }

    /// 🔌 Some batch never reached the cluster: refused, timed out, no such host.
    pub fn cluster_unreachable(&self) -> bool {
        self.objects.iter().any(|o| o.unreachable > 0)
    }

    pub fn total_decoded(&self) -> usize {
        self.objects.iter().map(|o| o.decoded).sum()
    }

    pub fn total_batches(&self) -> usize {
        self.objects.iter().map(|o| o.batches).sum()
    }

    /// 🍽️ One row per object, plus the reasons things went wrong underneath.
    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            "object", "status", "decoded", "skipped", "dropped", "coerced", "kept as string",
            "batches", "failed",
        ]);
        let right = |n: usize| Cell::new(n).set_alignment(CellAlignment::Right);
        for object in &self.objects {
            table.add_row(vec![
                Cell::new(&object.locator),
                Cell::new(object.status()),
                right(object.decoded),
                right(object.skipped),
                right(object.dropped),
                right(object.coerced),
                right(object.left_as_string),
                right(object.batches),
                right(object.batches_failed),
            ]);
        }

        let mut the_output = table.to_string();
        for object in &self.objects {
            if let Some(ref fatal) = object.fatal {
                the_output.push_str(&format!("\n💀 {}: {}", object.locator, fatal));
            }
            for err in &object.dispatch_errors {
                the_output.push_str(&format!("\n📡 {}: {}", object.locator, err));
            }
        }
        the_output
    }
}
