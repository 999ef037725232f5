use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use ferrite_engine::augment::Augment;
use ferrite_engine::data::{builtin_blobs, Batch, DataLoader};
use ferrite_engine::ema::EmaTracker;
use ferrite_engine::engine::{evaluate, train_one_epoch, Cpu, Device, Precision, TrainHooks, TrainOptions};
use ferrite_engine::metrics::MemorySink;
use ferrite_engine::network::{Network, NetworkSpec};
use ferrite_engine::optim::{Schedulable, StepLr};
use ferrite_engine::{ActivationFunction, Criterion, CrossEntropyLoss, EngineError, Matrix, Sgd};

/// Yields batches while counting how many were pulled.
struct Counted<I> {
    inner: I,
    pulled: Rc<Cell<usize>>,
}

impl<I: Iterator> Iterator for Counted<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let item = self.inner.next();
        if item.is_some() {
            self.pulled.set(self.pulled.get() + 1);
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I: ExactSizeIterator> ExactSizeIterator for Counted<I> {}

/// Returns scripted loss values in order and a zero gradient.
struct ScriptedLoss {
    values: RefCell<VecDeque<f64>>,
}

impl ScriptedLoss {
    fn new(values: &[f64]) -> ScriptedLoss {
        ScriptedLoss { values: RefCell::new(values.iter().copied().collect()) }
    }
}

impl Criterion for ScriptedLoss {
    fn loss(&self, _outputs: &Matrix, _targets: &Matrix) -> f64 {
        self.values.borrow_mut().pop_front().expect("more batches than scripted losses")
    }

    fn gradient(&self, outputs: &Matrix, _targets: &Matrix) -> Matrix {
        Matrix::zeros(outputs.rows, outputs.cols)
    }
}

#[derive(Default)]
struct CountingDevice {
    transfers: Cell<usize>,
    syncs: Cell<usize>,
}

impl Device for CountingDevice {
    fn transfer(&self, batch: Batch) -> Batch {
        self.transfers.set(self.transfers.get() + 1);
        batch
    }

    fn precision(&self) -> Precision {
        Precision::F64
    }

    fn synchronize(&self) {
        self.syncs.set(self.syncs.get() + 1);
    }
}

struct CountingSchedule {
    calls: Vec<usize>,
}

impl Schedulable for CountingSchedule {
    fn advance(&mut self, epoch: usize) -> f64 {
        self.calls.push(epoch);
        0.01
    }
}

#[derive(Default)]
struct CountingEma {
    updates: usize,
}

impl EmaTracker<Network> for CountingEma {
    fn update(&mut self, _model: &Network) {
        self.updates += 1;
    }
}

#[derive(Default)]
struct CountingAugment {
    calls: usize,
}

impl Augment for CountingAugment {
    fn apply(&mut self, inputs: Matrix, targets: Matrix) -> (Matrix, Matrix) {
        self.calls += 1;
        (inputs, targets)
    }
}

/// Replaces every input with zeros and every target with 0.5.
struct ConstantAugment;

impl Augment for ConstantAugment {
    fn apply(&mut self, inputs: Matrix, targets: Matrix) -> (Matrix, Matrix) {
        (
            Matrix::zeros(inputs.rows, inputs.cols),
            targets.map(|_| 0.5),
        )
    }
}

/// Remembers every (outputs, targets) pair it scores.
#[derive(Default)]
struct RecordingLoss {
    seen: RefCell<Vec<(Matrix, Matrix)>>,
}

impl Criterion for RecordingLoss {
    fn loss(&self, outputs: &Matrix, targets: &Matrix) -> f64 {
        self.seen.borrow_mut().push((outputs.clone(), targets.clone()));
        1.0
    }

    fn gradient(&self, outputs: &Matrix, _targets: &Matrix) -> Matrix {
        Matrix::zeros(outputs.rows, outputs.cols)
    }
}

fn two_class_net() -> Network {
    NetworkSpec::classifier("test", 2, 4, 2).build().unwrap()
}

fn blobs_loader(n: usize, batch_size: usize) -> DataLoader {
    let ds = builtin_blobs(n);
    DataLoader::new(ds.inputs, ds.classes, ds.num_classes, batch_size)
}

#[test]
fn loss_average_is_mean_of_batch_losses() {
    let loader = blobs_loader(16, 4);
    let criterion = ScriptedLoss::new(&[1.0, 2.0, 3.0, 6.0]);
    let mut model = two_class_net();
    let mut optimizer = Sgd::new(0.1);
    let mut schedule = CountingSchedule { calls: Vec::new() };
    let device = CountingDevice::default();
    let mut sink = MemorySink::new();
    let mut ema = CountingEma::default();
    let mut augment = CountingAugment::default();

    let epoch = 2;
    let summary = train_one_epoch(
        &mut model,
        &criterion,
        loader.iter(epoch),
        &mut optimizer,
        &mut schedule,
        &device,
        epoch,
        &TrainOptions::default(),
        TrainHooks { ema: Some(&mut ema), augment: Some(&mut augment), sink: Some(&mut sink) },
    )
    .unwrap();

    assert_eq!(summary["loss"], 3.0);
    assert!((summary["lr"] - 0.01).abs() < 1e-12);
    assert_eq!(summary.len(), 2);

    assert_eq!(device.transfers.get(), 4);
    assert_eq!(device.syncs.get(), 4);
    assert_eq!(schedule.calls, vec![2, 2, 2, 2]);
    assert_eq!(ema.updates, 4);
    assert_eq!(augment.calls, 4);

    let steps: Vec<usize> = sink.tagged("train/loss").iter().map(|r| r.step).collect();
    assert_eq!(steps, vec![8, 9, 10, 11]);
    let values: Vec<f64> = sink.tagged("train/loss").iter().map(|r| r.value).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 6.0]);
}

#[test]
fn non_finite_loss_stops_before_next_batch() {
    let loader = blobs_loader(20, 4);
    let criterion = ScriptedLoss::new(&[0.5, f64::NAN, 0.5, 0.5, 0.5]);
    let mut model = two_class_net();
    let before = model.layers[0].weights.value.clone();
    let mut optimizer = Sgd::new(0.1);
    let mut schedule = StepLr::new(0.1, 10, 0.1);
    let device = CountingDevice::default();
    let mut sink = MemorySink::new();

    let pulled = Rc::new(Cell::new(0));
    let batches = Counted { inner: loader.iter(0), pulled: Rc::clone(&pulled) };

    let err = train_one_epoch(
        &mut model,
        &criterion,
        batches,
        &mut optimizer,
        &mut schedule,
        &device,
        0,
        &TrainOptions::default(),
        TrainHooks { sink: Some(&mut sink), ..TrainHooks::default() },
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::NonFiniteLoss { epoch: 0, step: 1, value } if value.is_nan()));
    assert_eq!(pulled.get(), 2);
    assert_eq!(device.syncs.get(), 1);
    assert_eq!(sink.records.len(), 1);
    // Zero gradients leave the weights untouched, so nothing leaked from the bad batch either.
    assert_eq!(model.layers[0].weights.value, before);
}

#[test]
fn infinite_loss_is_also_fatal() {
    let loader = blobs_loader(4, 4);
    let criterion = ScriptedLoss::new(&[f64::INFINITY]);
    let err = train_one_epoch(
        &mut two_class_net(),
        &criterion,
        loader.iter(0),
        &mut Sgd::new(0.1),
        &mut StepLr::new(0.1, 1, 1.0),
        &Cpu::new(),
        3,
        &TrainOptions::default(),
        TrainHooks::default(),
    )
    .unwrap_err();
    assert_eq!(err, EngineError::NonFiniteLoss { value: f64::INFINITY, epoch: 3, step: 0 });
}

#[test]
fn training_sets_requested_mode() {
    let loader = blobs_loader(4, 4);
    let mut model = two_class_net();
    let options = TrainOptions { set_training_mode: false, ..TrainOptions::default() };
    train_one_epoch(
        &mut model,
        &CrossEntropyLoss::new(),
        loader.iter(0),
        &mut Sgd::new(0.1),
        &mut StepLr::new(0.1, 1, 1.0),
        &Cpu::new(),
        0,
        &options,
        TrainHooks::default(),
    )
    .unwrap();
    use ferrite_engine::Model;
    assert!(!model.is_training());
}

#[test]
fn evaluate_reports_requested_topk() {
    let net = Network::new(vec![
        (8, 2, ActivationFunction::ReLU),
        (6, 8, ActivationFunction::Identity),
    ]);
    let inputs: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64 / 12.0, 1.0 - i as f64 / 12.0]).collect();
    let classes: Vec<usize> = (0..12).map(|i| i % 6).collect();
    let loader = DataLoader::new(inputs, classes, 6, 5);

    let mut model = net.clone();
    let mut sink = MemorySink::new();
    let multi = evaluate(loader.iter(0), &mut model, &Cpu::new(), 1, (1usize, 5usize), Some(&mut sink)).unwrap();
    assert!(multi.contains_key("acc1"));
    assert!(multi.contains_key("acc5"));
    assert!(multi.contains_key("loss"));
    assert!(multi["acc5"] >= multi["acc1"]);
    assert_eq!(sink.tagged("val/acc5").len(), 3);
    assert_eq!(sink.tagged("val/loss")[0].step, 3);

    let single = evaluate(loader.iter(0), &mut model, &Cpu::new(), 1, 1usize, None).unwrap();
    assert!(single.contains_key("acc1"));
    assert!(!single.contains_key("acc5"));
    assert_eq!(single["acc1"], multi["acc1"]);
}

#[test]
fn evaluate_does_not_change_weights() {
    let loader = blobs_loader(10, 3);
    let mut model = two_class_net();
    let before = model.clone();
    evaluate(loader.iter(0), &mut model, &Cpu::new(), 0, 1usize, None).unwrap();
    for (a, b) in model.layers.iter().zip(&before.layers) {
        assert_eq!(a.weights.value, b.weights.value);
        assert_eq!(a.biases.value, b.biases.value);
    }
}

#[test]
fn accuracy_is_weighted_by_batch_size() {
    // Two batches of sizes 2 and 1; a constant model always predicts class 0.
    let mut model = Network::new(vec![(2, 1, ActivationFunction::Identity)]);
    model.layers[0].weights.value = Matrix::zeros(1, 2);
    model.layers[0].biases.value = Matrix::from_data(vec![vec![1.0, 0.0]]);
    let loader = DataLoader::new(vec![vec![0.0]; 3], vec![0, 1, 0], 2, 2);

    let summary = evaluate(loader.iter(0), &mut model, &Cpu::new(), 0, 1usize, None).unwrap();
    assert!((summary["acc1"] - 200.0 / 3.0).abs() < 1e-9);
}

#[test]
fn blobs_become_separable() {
    let ds = builtin_blobs(320);
    let loader = DataLoader::new(ds.inputs, ds.classes, 2, 32).shuffled(1);
    let mut model = NetworkSpec::classifier("blobs", 2, 16, 2).build().unwrap();
    let criterion = CrossEntropyLoss::new();
    let mut optimizer = Sgd::new(0.1).with_momentum(0.9);
    let mut schedule = StepLr::new(0.1, 100, 1.0);
    let device = Cpu::new();

    let mut losses = Vec::new();
    for epoch in 0..30 {
        let stats = train_one_epoch(
            &mut model,
            &criterion,
            loader.iter(epoch),
            &mut optimizer,
            &mut schedule,
            &device,
            epoch,
            &TrainOptions { max_norm: Some(5.0), ..TrainOptions::default() },
            TrainHooks::default(),
        )
        .unwrap();
        losses.push(stats["loss"]);
    }
    assert!(losses.last().unwrap() < losses.first().unwrap());

    let summary = evaluate(loader.iter(0), &mut model, &device, 0, 1usize, None).unwrap();
    assert!(summary["acc1"] >= 90.0, "acc1 = {}", summary["acc1"]);
}

#[test]
fn augmented_batch_feeds_forward_and_loss() {
    let loader = blobs_loader(8, 4);
    let criterion = RecordingLoss::default();
    let mut model = two_class_net();
    let untouched = model.clone();
    let mut augment = ConstantAugment;

    train_one_epoch(
        &mut model,
        &criterion,
        loader.iter(0),
        &mut Sgd::new(0.1),
        &mut StepLr::new(0.1, 1, 1.0),
        &Cpu::new(),
        0,
        &TrainOptions::default(),
        TrainHooks { augment: Some(&mut augment), ..TrainHooks::default() },
    )
    .unwrap();

    use ferrite_engine::Model;
    let expected = untouched.predict(&Matrix::zeros(4, 2));
    let seen = criterion.seen.borrow();
    assert_eq!(seen.len(), 2);
    for (outputs, targets) in seen.iter() {
        assert_eq!(outputs, &expected);
        assert!(targets.as_slice().iter().all(|&t| t == 0.5));
    }
}

#[test]
fn single_k_other_than_one_reports_that_k() {
    let loader = blobs_loader(6, 3);
    let mut model = two_class_net();
    let summary = evaluate(loader.iter(0), &mut model, &Cpu::new(), 0, 5usize, None).unwrap();
    let keys: Vec<&str> = summary.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["acc5", "loss"]);
    // Two classes, so every row is within the top five.
    assert_eq!(summary["acc5"], 100.0);
}
