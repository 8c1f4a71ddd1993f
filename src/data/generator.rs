use rand::Rng;

/// Lag of the strong dependency: `x[t-3] = 1` raises `P(y[t] = 1)` by 0.5.
pub const LAG_STRONG: usize = 3;
pub const SHIFT_STRONG: f64 = 0.5;

/// Lag of the weak dependency: `x[t-8] = 1` lowers `P(y[t] = 1)` by 0.25.
pub const LAG_WEAK: usize = 8;
pub const SHIFT_WEAK: f64 = -0.25;

pub const BASE_PROBABILITY: f64 = 0.5;

/// A binary input sequence `x` and the labels `y` it influences.
///
/// Both vectors have the same length and hold only 0 or 1.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceData {
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

impl SequenceData {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Probability that `y[t] = 1` given the inputs.
///
/// A lag only contributes once `t` reaches it; earlier positions see the base rate.
pub fn label_probability(x: &[u8], t: usize) -> f64 {
    let mut p = BASE_PROBABILITY;
    if t >= LAG_STRONG && x[t - LAG_STRONG] == 1 {
        p += SHIFT_STRONG;
    }
    if t >= LAG_WEAK && x[t - LAG_WEAK] == 1 {
        p += SHIFT_WEAK;
    }
    p
}

/// Draws `size` uniform input bits and labels that follow `label_probability`.
pub fn generate<R: Rng + ?Sized>(size: usize, rng: &mut R) -> SequenceData {
    let x: Vec<u8> = (0..size).map(|_| rng.gen_range(0..=1u8)).collect();
    let y = (0..size)
        .map(|t| u8::from(rng.gen::<f64>() < label_probability(&x, t)))
        .collect();
    SequenceData { x, y }
}

/// Cross-entropy (nats) reached by a predictor at three levels of knowledge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceEntropies {
    /// Knows only the marginal `P(y = 1)`.
    pub no_dependency: f64,
    /// Knows the lag-3 dependency.
    pub first_dependency: f64,
    /// Knows both dependencies; the lowest loss any model can reach.
    pub both_dependencies: f64,
}

fn bernoulli_entropy(p: f64) -> f64 {
    [p, 1.0 - p]
        .iter()
        .filter(|&&q| q > 0.0)
        .map(|q| -q * q.ln())
        .sum()
}

/// Derives the reference entropies from the dependency rule.
///
/// The strong and weak inputs are independent fair bits, so each of the four
/// `(x[t-3], x[t-8])` combinations has weight 1/4.
pub fn expected_cross_entropy() -> ReferenceEntropies {
    let p = |strong: bool, weak: bool| {
        BASE_PROBABILITY
            + if strong { SHIFT_STRONG } else { 0.0 }
            + if weak { SHIFT_WEAK } else { 0.0 }
    };

    let marginal = (p(false, false) + p(false, true) + p(true, false) + p(true, true)) / 4.0;
    let given_strong = |s: bool| (p(s, false) + p(s, true)) / 2.0;

    ReferenceEntropies {
        no_dependency: bernoulli_entropy(marginal),
        first_dependency: (bernoulli_entropy(given_strong(true))
            + bernoulli_entropy(given_strong(false)))
            / 2.0,
        both_dependencies: [(false, false), (false, true), (true, false), (true, true)]
            .iter()
            .map(|&(s, w)| bernoulli_entropy(p(s, w)))
            .sum::<f64>()
            / 4.0,
    }
}
