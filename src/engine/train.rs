use std::time::Instant;

use tracing::info;

use crate::augment::Augment;
use crate::data::loader::Batch;
use crate::ema::EmaTracker;
use crate::engine::device::Device;
use crate::engine::model::Model;
use crate::error::EngineError;
use crate::loss::criterion::Criterion;
use crate::metrics::dist::SingleProcess;
use crate::metrics::epoch_stats::{format_hms, lr_meter, EpochStats, EpochSummary};
use crate::metrics::sink::ScalarSink;
use crate::optim::optimizer::Optimizable;
use crate::optim::scheduler::Schedulable;

/// Loop settings for `train_one_epoch`.
///
/// - `max_norm`: clip the global gradient norm when `Some(n)` with `n > 0`
/// - `print_freq`: a progress line is logged every `print_freq` batches
/// - `set_training_mode`: passed to `Model::set_training` before the loop
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub max_norm: Option<f64>,
    pub print_freq: usize,
    pub set_training_mode: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions { max_norm: None, print_freq: 20, set_training_mode: true }
    }
}

/// Optional collaborators of a training epoch. Absent hooks are skipped.
pub struct TrainHooks<'a, M: Model> {
    pub ema: Option<&'a mut dyn EmaTracker<M>>,
    pub augment: Option<&'a mut dyn Augment>,
    pub sink: Option<&'a mut dyn ScalarSink>,
}

impl<M: Model> Default for TrainHooks<'_, M> {
    fn default() -> Self {
        TrainHooks { ema: None, augment: None, sink: None }
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Runs one pass over `batches`, updating `model` once per batch, and
/// returns the epoch's global averages (`loss`, `lr`).
///
/// # Arguments
/// - `model`     : trained in place; switched to `options.set_training_mode` first
/// - `criterion` : scores the forward outputs against the (possibly augmented) targets
/// - `batches`   : the epoch's batches; its exact length fixes the sink step keys
/// - `optimizer` : zeroed and stepped once per batch
/// - `scheduler` : asked for the learning rate of `epoch` before every step
/// - `device`    : moves batches in, runs forward and loss under `autocast`, syncs after the step
/// - `epoch`     : used in the `Epoch: [n]` header and the step key `j + epoch * batch_count`
/// - `options`   : clipping threshold, progress cadence, training-mode flag
/// - `hooks`     : optional EMA tracker, augmentation and scalar sink
///
/// # Errors
/// - [`EngineError::NonFiniteLoss`] when a batch loss is NaN or infinite. The
///   epoch stops before that batch is applied and before another batch is
///   drawn; the caller decides how to end the run.
/// - [`EngineError::Shape`] when the model's outputs and the targets disagree.
#[allow(clippy::too_many_arguments)]
pub fn train_one_epoch<M, C, O, S, D, I>(
    model: &mut M,
    criterion: &C,
    batches: I,
    optimizer: &mut O,
    scheduler: &mut S,
    device: &D,
    epoch: usize,
    options: &TrainOptions,
    mut hooks: TrainHooks<'_, M>,
) -> Result<EpochSummary, EngineError>
where
    M: Model,
    C: Criterion + ?Sized,
    O: Optimizable + ?Sized,
    S: Schedulable + ?Sized,
    D: Device,
    I: IntoIterator<Item = Batch>,
    I::IntoIter: ExactSizeIterator,
{
    model.set_training(options.set_training_mode);

    let mut stats = EpochStats::new();
    stats.add_meter("lr", lr_meter());
    let header = format!("Epoch: [{}]", epoch);
    let print_freq = options.print_freq.max(1);

    let batches = batches.into_iter();
    let batch_count = batches.len();
    let start = Instant::now();

    for (j, batch) in batches.enumerate() {
        // ── Input ──────────────────────────────────────────────────────────
        let Batch { mut inputs, mut targets } = device.transfer(batch);

        if let Some(augment) = hooks.augment.as_deref_mut() {
            (inputs, targets) = augment.apply(inputs, targets);
        }

        // ── Forward + loss ─────────────────────────────────────────────────
        let (outputs, loss_value) = device.autocast(|precision| {
            let outputs = precision.round(model.forward(&inputs));
            if outputs.shape() != targets.shape() {
                return Err(EngineError::Shape(format!(
                    "outputs are {:?} but targets are {:?}",
                    outputs.shape(),
                    targets.shape()
                )));
            }
            let loss = criterion.loss(&outputs, &targets);
            Ok((outputs, loss))
        })?;

        if !loss_value.is_finite() {
            return Err(EngineError::NonFiniteLoss { value: loss_value, epoch, step: j });
        }

        // ── Update ─────────────────────────────────────────────────────────
        optimizer.zero_grad(&mut model.parameters_mut());
        let lr = scheduler.advance(epoch);
        optimizer.set_learning_rate(lr);

        model.backward(&criterion.gradient(&outputs, &targets));
        if let Some(max_norm) = options.max_norm.filter(|n| *n > 0.0) {
            model.clip_grad_norm(max_norm);
        }
        optimizer.step(&mut model.parameters_mut());

        device.synchronize();

        // ── Bookkeeping ────────────────────────────────────────────────────
        if let Some(ema) = hooks.ema.as_deref_mut() {
            ema.update(model);
        }

        if let Some(sink) = hooks.sink.as_deref_mut() {
            sink.record("train/loss", loss_value, j + epoch * batch_count);
        }

        stats.update("loss", loss_value, 1);
        stats.update("lr", optimizer.learning_rate(), 1);

        if j % print_freq == 0 || j + 1 == batch_count {
            info!("{}", stats.progress_line(&header, j, batch_count, start.elapsed()));
        }
    }

    let total = start.elapsed();
    info!(
        "{} Total time: {} ({:.4} s / it)",
        header,
        format_hms(total),
        total.as_secs_f64() / batch_count.max(1) as f64
    );

    stats.synchronize_between_processes(&SingleProcess);
    info!("Averaged stats: {}", stats);
    Ok(stats.global_averages())
}
