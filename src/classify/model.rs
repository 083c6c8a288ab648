use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier expects {expected} features, got {actual}")]
    FeatureLength { expected: usize, actual: usize },
    #[error("prediction failed: {0}")]
    Prediction(String),
    #[error("classifier returned an empty probability vector")]
    EmptyProbabilities,
    #[error("classifier returned a non-finite probability")]
    NonFiniteProbability,
    #[error("classifier returned probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f64),
    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),
    #[error("classifier worker disconnected")]
    Disconnected,
    #[error("previous classifier call is still running")]
    Busy,
}

/// Label and class-probability vector for one feature vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probabilities: Vec<f64>,
}
impl Prediction {
    /// Largest class probability.
    pub fn confidence(&self) -> Result<f64, ClassifierError> {
        if self.probabilities.is_empty() {
            return Err(ClassifierError::EmptyProbabilities);
        }
        if self.probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::NonFiniteProbability);
        }
        if let Some(&p) = self.probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ClassifierError::ProbabilityOutOfRange(p));
        }
        Ok(self
            .probabilities
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max))
    }
}

/// Inference contract of a trained statistical classifier. Any model family
/// can sit behind it; training is out of scope.
pub trait StateClassifier: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<String, ClassifierError>;
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError>;
    fn classify(&self, features: &[f64]) -> Result<Prediction, ClassifierError> {
        Ok(Prediction {
            label: self.predict(features)?,
            probabilities: self.predict_proba(features)?,
        })
    }
}
impl<C: StateClassifier + ?Sized> StateClassifier for Arc<C> {
    fn predict(&self, features: &[f64]) -> Result<String, ClassifierError> {
        (**self).predict(features)
    }
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        (**self).predict_proba(features)
    }
    fn classify(&self, features: &[f64]) -> Result<Prediction, ClassifierError> {
        (**self).classify(features)
    }
}

type Job = Box<dyn FnOnce(&dyn StateClassifier) + Send>;

/// Clears the in-flight flag when a call finishes, including by panic.
struct InFlight(Arc<AtomicBool>);
impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs a slow or remote classifier on one dedicated worker thread and gives
/// up after a deadline. A late answer is dropped. At most one call is in
/// flight: while it is, new requests fail with `Busy` without queueing.
pub struct DeadlineClassifier {
    jobs: Mutex<mpsc::Sender<Job>>,
    busy: Arc<AtomicBool>,
    timeout: Duration,
}
impl DeadlineClassifier {
    pub fn new(inner: Arc<dyn StateClassifier>, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::spawn(move || {
            for job in rx {
                job(&*inner);
            }
            debug!("classifier worker stopped");
        });
        Self {
            jobs: Mutex::new(tx),
            busy: Arc::new(AtomicBool::new(false)),
            timeout,
        }
    }
    /// Whether a previous call is still running on the worker.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
    fn run<T: Send + 'static>(
        &self,
        features: &[f64],
        call: fn(&dyn StateClassifier, &[f64]) -> Result<T, ClassifierError>,
    ) -> Result<T, ClassifierError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(ClassifierError::Busy);
        }
        let in_flight = InFlight(Arc::clone(&self.busy));
        let (tx, rx) = mpsc::channel();
        let features = features.to_vec();
        let job: Job = Box::new(move |model| {
            let result = call(model, &features);
            drop(in_flight);
            tx.send(result).ok();
        });
        // A rejected job is dropped here, which clears the flag.
        if self.jobs.lock().send(job).is_err() {
            return Err(ClassifierError::Disconnected);
        }
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ClassifierError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ClassifierError::Disconnected),
        }
    }
}
impl StateClassifier for DeadlineClassifier {
    fn predict(&self, features: &[f64]) -> Result<String, ClassifierError> {
        self.run(features, |c, f| c.predict(f))
    }
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        self.run(features, |c, f| c.predict_proba(f))
    }
    /// One round trip for both calls, under a single deadline.
    fn classify(&self, features: &[f64]) -> Result<Prediction, ClassifierError> {
        self.run(features, |c, f| c.classify(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    struct Slow(Duration);
    impl StateClassifier for Slow {
        fn predict(&self, _features: &[f64]) -> Result<String, ClassifierError> {
            thread::sleep(self.0);
            Ok("focused".into())
        }
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
            Ok(vec![0.9, 0.1])
        }
    }
    #[test]
    fn confidence_is_max_probability() {
        let p = Prediction {
            label: "calm".into(),
            probabilities: vec![0.1, 0.6, 0.3],
        };
        assert_eq!(p.confidence().unwrap(), 0.6);
        let empty = Prediction {
            label: "calm".into(),
            probabilities: vec![],
        };
        assert!(matches!(empty.confidence(), Err(ClassifierError::EmptyProbabilities)));
        let inflated = Prediction {
            label: "focused".into(),
            probabilities: vec![7.5],
        };
        assert!(matches!(
            inflated.confidence(),
            Err(ClassifierError::ProbabilityOutOfRange(p)) if p == 7.5
        ));
    }
    #[test]
    fn deadline_passes_fast_answers_through() {
        let c = DeadlineClassifier::new(Arc::new(Slow(Duration::ZERO)), Duration::from_secs(5));
        let p = c.classify(&[0.0; 4]).unwrap();
        assert_eq!(p.label, "focused");
        assert_eq!(p.probabilities, vec![0.9, 0.1]);
    }
    #[test]
    fn deadline_times_out_slow_answers() {
        let c = DeadlineClassifier::new(
            Arc::new(Slow(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        assert!(matches!(c.classify(&[0.0; 4]), Err(ClassifierError::Timeout(_))));
    }

    /// Blocks every prediction until the gate sender is dropped.
    struct Gated {
        gate: Mutex<mpsc::Receiver<()>>,
        started: AtomicUsize,
    }
    impl StateClassifier for Gated {
        fn predict(&self, _features: &[f64]) -> Result<String, ClassifierError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.gate.lock().recv().ok();
            Ok("relaxed".into())
        }
        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
            Ok(vec![0.8, 0.2])
        }
    }
    #[test]
    fn hung_model_holds_a_single_call() {
        let (release, gate) = mpsc::channel();
        let model = Arc::new(Gated {
            gate: Mutex::new(gate),
            started: AtomicUsize::new(0),
        });
        let c = DeadlineClassifier::new(model.clone(), Duration::from_millis(10));
        assert!(matches!(c.classify(&[0.0; 4]), Err(ClassifierError::Timeout(_))));
        for _ in 0..20 {
            assert!(matches!(c.classify(&[0.0; 4]), Err(ClassifierError::Busy)));
        }
        assert!(c.is_busy());
        assert_eq!(model.started.load(Ordering::SeqCst), 1);

        drop(release);
        let mut answered = None;
        for _ in 0..200 {
            match c.classify(&[0.0; 4]) {
                Ok(p) => {
                    answered = Some(p);
                    break;
                }
                Err(_) => thread::sleep(Duration::from_millis(10)),
            }
        }
        assert_eq!(answered.unwrap().label, "relaxed");
        assert!(model.started.load(Ordering::SeqCst) >= 2);
    }
}
