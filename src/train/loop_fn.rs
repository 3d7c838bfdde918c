use std::time::Instant;

use crate::checkpoint::save_model;
use crate::data::loader::BatchSource;
use crate::device::Device;
use crate::error::Result;
use crate::loss::Criterion;
use crate::metrics::summary_writer::SummaryWriter;
use crate::metrics::ScalarSink;
use crate::model::Model;
use crate::optim::scheduler::LrScheduler;
use crate::optim::Optimizer;
use crate::train::early_stopping::EarlyStopping;
use crate::train::epoch_stats::{EpochStats, TrainSummary};
use crate::train::running::{count_correct, RunningTotals};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `model` for up to `config.num_epochs` epochs, writing metrics to a
/// fresh `SummaryWriter` in `config.log_dir`.
///
/// `config` is validated before the event file is created. The writer is
/// closed before returning, on the early-stop path as well as after the last
/// epoch. See `train_with_sink` for the per-epoch sequence.
#[allow(clippy::too_many_arguments)]
pub fn train<M, C, O, S>(
    model: &mut M,
    train_loader: &mut dyn BatchSource,
    val_loader: &mut dyn BatchSource,
    criterion: &C,
    optimizer: &mut O,
    scheduler: &mut S,
    device: Device,
    config: &TrainConfig,
) -> Result<TrainSummary>
where
    M: Model + ?Sized,
    C: Criterion + ?Sized,
    O: Optimizer,
    S: LrScheduler + ?Sized,
{
    config.validate()?;
    let mut writer = SummaryWriter::new(&config.log_dir)?;
    train_with_sink(
        model,
        train_loader,
        val_loader,
        criterion,
        optimizer,
        scheduler,
        device,
        config,
        &mut writer,
    )
}

/// Trains `model`, reporting scalars to `sink`.
///
/// Each epoch:
/// 1. one training pass (zero grad, forward, loss, backward, step per batch)
/// 2. one validation pass in eval mode, without parameter updates
/// 3. `Loss/train`, `Loss/val`, `Accuracy/train`, `Accuracy/val` go to `sink`
///    at step = epoch
/// 4. the scheduler steps on the validation loss
/// 5. a strictly lower validation loss saves the model to `config.save_path`
///    and resets the stale counter; anything else increments it
/// 6. a summary line is printed
/// 7. training stops once the stale counter reaches `config.patience`
///
/// `sink` is closed exactly once before returning `Ok`. On error it is closed
/// on a best-effort basis and the original error is returned.
#[allow(clippy::too_many_arguments)]
pub fn train_with_sink<M, C, O, S>(
    model: &mut M,
    train_loader: &mut dyn BatchSource,
    val_loader: &mut dyn BatchSource,
    criterion: &C,
    optimizer: &mut O,
    scheduler: &mut S,
    device: Device,
    config: &TrainConfig,
    sink: &mut dyn ScalarSink,
) -> Result<TrainSummary>
where
    M: Model + ?Sized,
    C: Criterion + ?Sized,
    O: Optimizer,
    S: LrScheduler + ?Sized,
{
    let outcome = run_epochs(
        model,
        train_loader,
        val_loader,
        criterion,
        optimizer,
        scheduler,
        device,
        config,
        sink,
    );
    match outcome {
        Ok(summary) => {
            sink.close()?;
            Ok(summary)
        }
        Err(e) => {
            if let Err(close_err) = sink.close() {
                tracing::warn!(error = %close_err, "failed to close metrics sink after error");
            }
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn run_epochs<M, C, O, S>(
    model: &mut M,
    train_loader: &mut dyn BatchSource,
    val_loader: &mut dyn BatchSource,
    criterion: &C,
    optimizer: &mut O,
    scheduler: &mut S,
    device: Device,
    config: &TrainConfig,
    sink: &mut dyn ScalarSink,
) -> Result<TrainSummary>
where
    M: Model + ?Sized,
    C: Criterion + ?Sized,
    O: Optimizer,
    S: LrScheduler + ?Sized,
{
    config.validate()?;
    model.to_device(device)?;
    tracing::info!(%device, epochs = config.num_epochs, patience = config.patience, "starting training");

    let mut stopper = EarlyStopping::new(config.patience);
    let mut history = Vec::with_capacity(config.num_epochs);
    let mut best_epoch = None;
    let mut stopped_early = false;

    for epoch in 1..=config.num_epochs {
        let t_start = Instant::now();

        // ── One full pass over the training data ───────────────────────────
        let (train_loss, train_accuracy) =
            train_one_epoch(model, train_loader, criterion, optimizer, device)?;

        // ── Validation ────────────────────────────────────────────────────
        let (val_loss, val_accuracy) = evaluate(model, val_loader, criterion, device)?;

        // ── Metrics ───────────────────────────────────────────────────────
        let step = epoch as u64;
        sink.add_scalar("Loss/train", train_loss, step)?;
        sink.add_scalar("Loss/val", val_loss, step)?;
        sink.add_scalar("Accuracy/train", train_accuracy, step)?;
        sink.add_scalar("Accuracy/val", val_accuracy, step)?;

        scheduler.step(val_loss, optimizer);

        // ── Checkpoint on strict improvement ──────────────────────────────
        let improved = stopper.update(val_loss);
        if improved {
            save_model(&*model, &config.save_path)?;
            best_epoch = Some(epoch);
            tracing::debug!(epoch, val_loss, path = %config.save_path.display(), "new best model saved");
        }

        let stats = EpochStats {
            epoch,
            total_epochs: config.num_epochs,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            learning_rate: optimizer.learning_rate(),
            improved,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        println!("{}", stats.summary_line());
        tracing::info!(
            epoch,
            train_loss,
            val_loss,
            train_accuracy,
            val_accuracy,
            lr = stats.learning_rate,
            "epoch finished"
        );
        history.push(stats);

        if stopper.should_stop() {
            println!(
                "\nEarly stopping triggered after {} epochs (no val improvement in {} rounds).\n",
                epoch,
                stopper.patience()
            );
            tracing::warn!(epoch, patience = stopper.patience(), "early stopping");
            stopped_early = true;
            break;
        }
    }

    Ok(TrainSummary {
        epochs_run: history.len(),
        best_val_loss: stopper.best(),
        best_epoch,
        stopped_early,
        history,
    })
}

/// One pass of mini-batch updates. Returns sample-weighted `(loss, accuracy)`
/// computed from the outputs seen before each update.
fn train_one_epoch<M, C, O>(
    model: &mut M,
    loader: &mut dyn BatchSource,
    criterion: &C,
    optimizer: &mut O,
    device: Device,
) -> Result<(f64, f64)>
where
    M: Model + ?Sized,
    C: Criterion + ?Sized,
    O: Optimizer,
{
    model.train();
    let mut totals = RunningTotals::default();

    for batch in loader.batches() {
        let batch = batch.to(device)?;
        optimizer.zero_grad(model.parameters_mut());

        let outputs = model.forward(&batch.images)?;
        let (loss, grad) = criterion.loss_and_grad(&outputs, &batch.labels)?;
        model.backward(&grad)?;
        optimizer.step(model.parameters_mut());

        let correct = count_correct(&outputs.argmax_rows(), &batch.labels);
        totals.update(loss, correct, batch.len());
    }

    totals.finish("training")
}

/// One pass without updates, in eval mode. Returns sample-weighted
/// `(loss, accuracy)`.
pub fn evaluate<M, C>(
    model: &mut M,
    loader: &mut dyn BatchSource,
    criterion: &C,
    device: Device,
) -> Result<(f64, f64)>
where
    M: Model + ?Sized,
    C: Criterion + ?Sized,
{
    model.eval();
    let mut totals = RunningTotals::default();

    for batch in loader.batches() {
        let batch = batch.to(device)?;
        let outputs = model.forward(&batch.images)?;
        let loss = criterion.loss(&outputs, &batch.labels)?;
        let correct = count_correct(&outputs.argmax_rows(), &batch.labels);
        totals.update(loss, correct, batch.len());
    }

    totals.finish("validation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batch::{Batch, ImageShape};
    use crate::error::FitError;
    use crate::math::matrix::Matrix;
    use crate::metrics::memory::MemorySink;
    use crate::model::{Mode, Parameter, StateDict};
    use crate::optim::scheduler::ConstantLr;
    use crate::optim::sgd::Sgd;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A model whose validation loss follows a script; one output column per
    /// class, with the logits fixed so the criterion sees what we want.
    struct Scripted {
        val_losses: Vec<f64>,
        evals: usize,
        mode: Mode,
        param: Parameter,
        steps_seen: Rc<RefCell<usize>>,
    }

    impl Scripted {
        fn new(val_losses: Vec<f64>) -> Self {
            Scripted {
                val_losses,
                evals: 0,
                mode: Mode::Train,
                param: Parameter::new(Matrix::zeros(1, 1)),
                steps_seen: Rc::new(RefCell::new(0)),
            }
        }
    }

    impl Model for Scripted {
        fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
            let value = match self.mode {
                Mode::Train => 0.0,
                Mode::Eval => {
                    let v = self.val_losses[self.evals.min(self.val_losses.len() - 1)];
                    self.evals += 1;
                    v
                }
            };
            // column 0 carries the scripted loss for `PassThrough`
            let mut out = Matrix::zeros(input.rows, 2);
            for r in 0..input.rows {
                out.set(r, 0, value);
            }
            Ok(out)
        }

        fn backward(&mut self, _grad: &Matrix) -> Result<()> {
            *self.steps_seen.borrow_mut() += 1;
            Ok(())
        }

        fn set_mode(&mut self, mode: Mode) {
            self.mode = mode;
        }

        fn mode(&self) -> Mode {
            self.mode
        }

        fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
            vec![&mut self.param]
        }

        fn state_dict(&self) -> StateDict {
            StateDict::from([("p".to_owned(), self.param.value.clone())])
        }

        fn load_state_dict(&mut self, _state: &StateDict) -> Result<()> {
            Ok(())
        }

        fn to_device(&mut self, device: Device) -> Result<()> {
            device.ensure_available()
        }
    }

    /// Reports column 0 of the first row as the batch loss.
    struct PassThrough;

    impl Criterion for PassThrough {
        fn loss(&self, outputs: &Matrix, _labels: &[usize]) -> Result<f64> {
            Ok(outputs.get(0, 0))
        }

        fn loss_and_grad(&self, outputs: &Matrix, labels: &[usize]) -> Result<(f64, Matrix)> {
            Ok((self.loss(outputs, labels)?, Matrix::zeros(outputs.rows, outputs.cols)))
        }
    }

    /// Records every metric it is stepped with.
    #[derive(Default)]
    struct Recording {
        seen: Vec<f64>,
    }

    impl LrScheduler for Recording {
        fn step(&mut self, metric: f64, _optimizer: &mut dyn Optimizer) {
            self.seen.push(metric);
        }
    }

    fn one_batch(n: usize) -> Vec<Batch> {
        vec![Batch::new(Matrix::zeros(n, 1), vec![0; n], ImageShape::new(1, 1, 1)).unwrap()]
    }

    fn config(dir: &std::path::Path, epochs: usize) -> TrainConfig {
        TrainConfig {
            num_epochs: epochs,
            patience: 5,
            save_path: dir.join("best.json"),
            log_dir: dir.join("logs"),
        }
    }

    fn run(val_losses: Vec<f64>, epochs: usize) -> (TrainSummary, MemorySink) {
        let dir = tempfile::tempdir().unwrap();
        let mut model = Scripted::new(val_losses);
        let mut sink = MemorySink::new();
        let summary = train_with_sink(
            &mut model,
            &mut one_batch(2),
            &mut one_batch(2),
            &PassThrough,
            &mut Sgd::new(0.1),
            &mut ConstantLr,
            Device::Cpu,
            &config(dir.path(), epochs),
            &mut sink,
        )
        .unwrap();
        (summary, sink)
    }

    #[test]
    fn saves_only_on_strict_improvement() {
        let (summary, _) = run(vec![1.0, 0.8, 0.8, 0.9, 0.5, 0.6], 6);
        let improved: Vec<bool> = summary.history.iter().map(|s| s.improved).collect();
        assert_eq!(improved, vec![true, true, false, false, true, false]);
        assert_eq!(summary.best_epoch, Some(5));
        assert_eq!(summary.best_val_loss, 0.5);
        assert!(!summary.stopped_early);
    }

    #[test]
    fn stops_after_five_stale_epochs() {
        let (summary, sink) = run(vec![1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 0.1], 20);
        assert!(summary.stopped_early);
        assert_eq!(summary.epochs_run, 6);
        assert_eq!(sink.series("Loss/val").len(), 6);
        assert_eq!(sink.closed, 1);
    }

    #[test]
    fn stale_counter_resets_on_improvement() {
        // four stale, improve, four stale: never reaches five in a row
        let losses = vec![1.0, 2.0, 2.0, 2.0, 2.0, 0.5, 2.0, 2.0, 2.0, 2.0];
        let (summary, _) = run(losses, 10);
        assert!(!summary.stopped_early);
        assert_eq!(summary.epochs_run, 10);
    }

    #[test]
    fn logs_four_scalars_per_epoch_at_epoch_step() {
        let (_, sink) = run(vec![0.3, 0.2, 0.1], 3);
        assert_eq!(sink.records.len(), 12);
        let tags: Vec<&str> = sink.records[..4].iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(tags, ["Loss/train", "Loss/val", "Accuracy/train", "Accuracy/val"]);
        assert_eq!(sink.series("Loss/val"), vec![(1, 0.3), (2, 0.2), (3, 0.1)]);
    }

    #[test]
    fn zero_epochs_runs_nothing_but_closes_sink() {
        let (summary, sink) = run(vec![1.0], 0);
        assert_eq!(summary.epochs_run, 0);
        assert!(sink.records.is_empty());
        assert_eq!(sink.closed, 1);
    }

    #[test]
    fn empty_validation_source_is_reported_and_sink_closed() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = Scripted::new(vec![1.0]);
        let mut sink = MemorySink::new();
        let err = train_with_sink(
            &mut model,
            &mut one_batch(1),
            &mut Vec::<Batch>::new(),
            &PassThrough,
            &mut Sgd::new(0.1),
            &mut ConstantLr,
            Device::Cpu,
            &config(dir.path(), 3),
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, FitError::EmptySource { phase: "validation" }));
        assert_eq!(sink.closed, 1);
    }

    #[test]
    fn one_backward_per_training_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = Scripted::new(vec![1.0, 0.5]);
        let steps = Rc::clone(&model.steps_seen);
        let mut train_batches = one_batch(1);
        train_batches.extend(one_batch(3));
        train_with_sink(
            &mut model,
            &mut train_batches,
            &mut one_batch(1),
            &PassThrough,
            &mut Sgd::new(0.1),
            &mut ConstantLr,
            Device::Cpu,
            &config(dir.path(), 2),
            &mut MemorySink::new(),
        )
        .unwrap();
        assert_eq!(*steps.borrow(), 4);
    }

    #[test]
    fn scheduler_sees_each_validation_loss() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = Scripted::new(vec![0.9, 0.7, 0.8, 0.4]);
        let mut sink = MemorySink::new();
        let mut scheduler = Recording::default();
        train_with_sink(
            &mut model,
            &mut one_batch(2),
            &mut one_batch(2),
            &PassThrough,
            &mut Sgd::new(0.1),
            &mut scheduler,
            Device::Cpu,
            &config(dir.path(), 4),
            &mut sink,
        )
        .unwrap();

        let logged: Vec<f64> = sink.series("Loss/val").into_iter().map(|(_, v)| v).collect();
        assert_eq!(scheduler.seen, logged);
        assert_eq!(scheduler.seen, vec![0.9, 0.7, 0.8, 0.4]);
    }

    #[test]
    fn invalid_config_leaves_log_dir_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = config(dir.path(), 3);
        bad.patience = 0;
        let err = train(
            &mut Scripted::new(vec![1.0]),
            &mut one_batch(1),
            &mut one_batch(1),
            &PassThrough,
            &mut Sgd::new(0.1),
            &mut ConstantLr,
            Device::Cpu,
            &bad,
        )
        .unwrap_err();
        assert!(matches!(err, FitError::InvalidConfig(_)));
        assert!(!bad.log_dir.exists());
    }
}
