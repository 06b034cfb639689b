// ai
//! 🔄 Transforms: everything that happens to a record between "decoded" and "sent" 🎭
//!
//! ```text
//!   Avro datum ──▶ Record ──▶ normalize ──▶ Record ──▶ render ──▶ NDJSON bulk body
//!   (decoder)     {"price":    (unwrap +     {"price":   (policy)   {"update":{...}}
//!                  {"string":   coerce)       12.5}                 {"doc":{...},...}
//!                   "12.5"}}
//! ```
//!
//! - [`normalize`]: tagged-scalar unwrap + the per-field coercion table
//! - [`opensearch`]: the `_bulk` renderer and the action policy it obeys
//!
//! Both halves are synchronous and pure. The I/O lives in `backends`. 🦆

pub mod normalize;
pub mod opensearch;

pub use normalize::{
    CoercionOutcome, CoercionRule, CoercionTable, NormalizeReport, Normalizer, UnwrapOutcome,
};
pub use opensearch::{BulkAction, BulkActionPolicy, BulkRenderer, RecordRender, RenderedBatch};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{FieldValue, Record, tagged};

    /// 🧪 normalize → render, the products scenario end to end minus the I/O
    #[test]
    fn the_one_where_tagged_prices_travel_all_the_way_to_bulk_format() -> anyhow::Result<()> {
        let the_normalizer =
            Normalizer::new(CoercionTable::from([("price".to_string(), CoercionRule::Float)]));
        let the_renderer = BulkRenderer::new(BulkActionPolicy::new(
            "products",
            BulkAction::Upsert,
            Some("id".to_string()),
        )?);

        let mut the_batch = vec![
            Record::from([
                ("id".to_string(), tagged("string", "p1")),
                ("price".to_string(), tagged("string", "12.5")),
            ]),
            Record::from([
                ("id".to_string(), tagged("string", "p2")),
                ("price".to_string(), tagged("string", "bad")),
            ]),
        ];
        for record in the_batch.iter_mut() {
            the_normalizer.normalize(record);
        }

        assert_eq!(the_batch[0]["price"], FieldValue::Float(12.5));
        assert_eq!(the_batch[1]["price"], FieldValue::from("bad"));

        let the_output = the_renderer.render(&the_batch)?;
        assert_eq!(the_output.rendered, 2);
        assert_eq!(
            the_output.payload,
            concat!(
                "{\"update\":{\"_index\":\"products\",\"_id\":\"p1\"}}\n",
                "{\"doc\":{\"id\":\"p1\",\"price\":12.5},\"doc_as_upsert\":true}\n",
                "{\"update\":{\"_index\":\"products\",\"_id\":\"p2\"}}\n",
                "{\"doc\":{\"id\":\"p2\",\"price\":\"bad\"},\"doc_as_upsert\":true}\n",
            )
        );
        Ok(())
    }
}
