use std::time::Instant;

use tracing::{info, warn};

use crate::data::loader::Batch;
use crate::engine::accuracy::{accuracy, TopK};
use crate::engine::device::Device;
use crate::engine::model::Model;
use crate::error::EngineError;
use crate::loss::criterion::Criterion;
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::metrics::dist::SingleProcess;
use crate::metrics::epoch_stats::{format_hms, EpochStats, EpochSummary};
use crate::metrics::sink::ScalarSink;

const PRINT_FREQ: usize = 20;

/// Scores `model` on every batch of `batches` without touching gradients and
/// returns the global averages of `loss` and `acc{k}` for each requested k.
///
/// Loss is averaged per batch; accuracies are weighted by batch size.
pub fn evaluate<M, D, I>(
    batches: I,
    model: &mut M,
    device: &D,
    epoch: usize,
    topk: impl Into<TopK>,
    mut sink: Option<&mut dyn ScalarSink>,
) -> Result<EpochSummary, EngineError>
where
    M: Model,
    D: Device,
    I: IntoIterator<Item = Batch>,
    I::IntoIter: ExactSizeIterator,
{
    let criterion = CrossEntropyLoss::new();
    let topk = topk.into();
    let mut stats = EpochStats::new();
    let header = "Test:";

    model.set_training(false);
    let model: &M = model;

    let batches = batches.into_iter();
    let batch_count = batches.len();
    let start = Instant::now();

    for (j, batch) in batches.enumerate() {
        let batch = device.transfer(batch);
        let classes = batch.classes();
        let batch_size = batch.len();

        let (outputs, loss) = device.autocast(|precision| {
            let outputs = precision.round(model.predict(&batch.inputs));
            if outputs.shape() != batch.targets.shape() {
                return Err(EngineError::Shape(format!(
                    "outputs are {:?} but targets are {:?}",
                    outputs.shape(),
                    batch.targets.shape()
                )));
            }
            let loss = criterion.loss(&outputs, &batch.targets);
            Ok((outputs, loss))
        })?;

        let accs = accuracy(&outputs, &classes, topk.ks());

        stats.update("loss", loss, 1);
        for (&k, &acc) in topk.ks().iter().zip(&accs) {
            stats.update(&TopK::metric_name(k), acc, batch_size);
        }

        if let Some(sink) = sink.as_deref_mut() {
            let step = j + epoch * batch_count;
            sink.record("val/loss", loss, step);
            for (&k, &acc) in topk.ks().iter().zip(&accs) {
                sink.record(&format!("val/{}", TopK::metric_name(k)), acc, step);
            }
        }

        if j % PRINT_FREQ == 0 || j + 1 == batch_count {
            info!("{}", stats.progress_line(header, j, batch_count, start.elapsed()));
        }
    }

    let total = start.elapsed();
    info!("{} Total time: {}", header, format_hms(total));

    stats.synchronize_between_processes(&SingleProcess);
    let summary = stats.global_averages();
    if summary.is_empty() {
        warn!("{} no batches were evaluated", header);
    } else {
        info!("{}", summary_line(&summary, &topk));
    }
    Ok(summary)
}

/// `* Acc@1 x.xxx Acc@5 y.yyy loss z.zzz`, listing only the requested ks.
pub fn summary_line(summary: &EpochSummary, topk: &TopK) -> String {
    let mut line = String::from("*");
    for &k in topk.ks() {
        let acc = summary.get(&TopK::metric_name(k)).copied().unwrap_or(0.0);
        line.push_str(&format!(" Acc@{} {:.3}", k, acc));
    }
    let loss = summary.get("loss").copied().unwrap_or(0.0);
    line.push_str(&format!(" loss {:.3}", loss));
    line
}
