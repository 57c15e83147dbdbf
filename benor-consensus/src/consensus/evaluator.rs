use benor_common::Value;

/// Occurrences of each value among the filled entries of a phase buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub zeros: usize,
    pub ones: usize,
}

impl Tally {
    pub fn count(entries: &[Option<Value>]) -> Self {
        entries.iter().flatten().fold(Tally::default(), |mut tally, v| {
            match v {
                Value::Zero => tally.zeros += 1,
                Value::One => tally.ones += 1,
            }
            tally
        })
    }
}

/// Majority rule over a phase buffer with quorum threshold `(N - F) / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorityEvaluator {
    n: usize,
    f: usize,
}

impl MajorityEvaluator {
    pub fn new(n: usize, f: usize) -> Self {
        Self { n, f }
    }

    /// `count > (N - F) / 2`, compared without leaving the integers.
    fn exceeds_threshold(&self, count: usize) -> bool {
        2 * count > self.n - self.f
    }

    /// 0 if zeros clear the threshold, else 1 if ones do, else 1.
    pub fn evaluate(&self, entries: &[Option<Value>]) -> (Value, Tally) {
        let tally = Tally::count(entries);
        let value = if self.exceeds_threshold(tally.zeros) {
            Value::Zero
        } else {
            // Ones clearing the threshold and the tie-break agree.
            Value::One
        };
        (value, tally)
    }

    pub fn majority(&self, entries: &[Option<Value>]) -> Value {
        self.evaluate(entries).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Z: Option<Value> = Some(Value::Zero);
    const O: Option<Value> = Some(Value::One);

    #[test]
    fn zeros_above_threshold_win() {
        // N=4, F=0: threshold 2, three zeros clear it.
        let evaluator = MajorityEvaluator::new(4, 0);
        assert_eq!(evaluator.majority(&[Z, Z, Z, O]), Value::Zero);
    }

    #[test]
    fn ones_above_threshold_win() {
        let evaluator = MajorityEvaluator::new(4, 0);
        assert_eq!(evaluator.majority(&[O, Z, O, O]), Value::One);
    }

    #[test]
    fn tie_defaults_to_one() {
        let evaluator = MajorityEvaluator::new(4, 0);
        assert_eq!(evaluator.majority(&[Z, Z, O, O]), Value::One);
    }

    #[test]
    fn empty_buffer_defaults_to_one() {
        let evaluator = MajorityEvaluator::new(3, 1);
        assert_eq!(evaluator.majority(&[None, None, None]), Value::One);
    }

    #[test]
    fn threshold_uses_real_division() {
        // N=4, F=1: threshold 1.5, so two zeros are a majority.
        let evaluator = MajorityEvaluator::new(4, 1);
        assert_eq!(evaluator.majority(&[Z, None, Z, O]), Value::Zero);

        // N=5, F=0: threshold 2.5, two zeros are not.
        let evaluator = MajorityEvaluator::new(5, 0);
        assert_eq!(evaluator.majority(&[Z, Z, None, None, None]), Value::One);
        assert_eq!(evaluator.majority(&[Z, Z, Z, None, None]), Value::Zero);
    }

    #[test]
    fn empty_slots_are_not_counted() {
        let (_, tally) = MajorityEvaluator::new(4, 0).evaluate(&[Z, None, O, None]);
        assert_eq!(tally, Tally { zeros: 1, ones: 1 });
    }

    #[test]
    fn result_matches_threshold_rule_for_every_buffer() {
        let slots = [None, Z, O];
        for n in 1..=4usize {
            for f in 0..=n {
                let evaluator = MajorityEvaluator::new(n, f);
                let t = (n - f) as f64 / 2.0;
                for code in 0..3usize.pow(n as u32) {
                    let buffer: Vec<Option<Value>> =
                        (0..n).map(|i| slots[(code / 3usize.pow(i as u32)) % 3]).collect();
                    let tally = Tally::count(&buffer);
                    let expected = if tally.zeros as f64 > t {
                        Value::Zero
                    } else {
                        Value::One
                    };
                    assert_eq!(evaluator.majority(&buffer), expected, "n={n} f={f} {buffer:?}");
                }
            }
        }
    }
}
