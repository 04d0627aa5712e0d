use crate::features::{add, ExtractFeatures, FeatureCounts};
use crate::Parse;

/// Negative log probability of the parse.
///
/// Identifier: `NLogP`
#[derive(Clone, Debug, Default)]
pub struct NLogP;

impl ExtractFeatures for NLogP {
    type Key = i32;

    fn identifier(&self) -> &str {
        "NLogP"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<i32>) {
        add(counts, 0, -parse.log_prob());
    }
}

/// Negative log probability of the parse, conditioned on the sentence.
///
/// Identifier: `NLogCondP`
#[derive(Clone, Debug, Default)]
pub struct NLogCondP;

impl ExtractFeatures for NLogCondP {
    type Key = i32;

    fn identifier(&self) -> &str {
        "NLogCondP"
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<i32>) {
        add(counts, 0, -parse.log_cond_prob());
    }
}

// Negative conditional log probability in base `base`, with its bin in 1..=n_bins.
fn binned_log_cond_prob(parse: &Parse, n_bins: i32, log_base: f64) -> (i32, f64) {
    let nlcp = -parse.log_cond_prob() / log_base;
    let bin = (nlcp as i32).min(n_bins).max(1);
    (bin, nlcp)
}

fn binned_identifier(name: &str, n_bins: i32, base: f64) -> String {
    format!("{}:{}:{}", name, n_bins, base)
}

/// Bins of the conditional log probability.
///
/// Identifier: `BinnedLogCondP:<n_bins>:<base>`
#[derive(Clone, Debug)]
pub struct BinnedLogCondP {
    n_bins: i32,
    log_base: f64,
    identifier: String,
}

impl BinnedLogCondP {
    pub fn new(n_bins: i32, base: f64) -> Self {
        BinnedLogCondP {
            n_bins,
            log_base: base.ln(),
            identifier: binned_identifier("BinnedLogCondP", n_bins, base),
        }
    }
}

impl Default for BinnedLogCondP {
    fn default() -> Self {
        BinnedLogCondP::new(7, 2.)
    }
}

impl ExtractFeatures for BinnedLogCondP {
    type Key = i32;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<i32>) {
        let (bin, _) = binned_log_cond_prob(parse, self.n_bins, self.log_base);
        add(counts, bin, 1.);
    }
}

/// Bins of the conditional log probability, valued with the log probability.
///
/// Identifier: `InterpLogCondP:<n_bins>:<base>`
#[derive(Clone, Debug)]
pub struct InterpLogCondP {
    n_bins: i32,
    log_base: f64,
    identifier: String,
}

impl InterpLogCondP {
    pub fn new(n_bins: i32, base: f64) -> Self {
        InterpLogCondP {
            n_bins,
            log_base: base.ln(),
            identifier: binned_identifier("InterpLogCondP", n_bins, base),
        }
    }
}

impl Default for InterpLogCondP {
    fn default() -> Self {
        InterpLogCondP::new(7, 2.)
    }
}

impl ExtractFeatures for InterpLogCondP {
    type Key = i32;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn parse_featurecount(&self, parse: &Parse, counts: &mut FeatureCounts<i32>) {
        let (bin, nlcp) = binned_log_cond_prob(parse, self.n_bins, self.log_base);
        add(counts, bin, nlcp);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::features::tests::sentence;
    use crate::features::{
        BinnedLogCondP, ExtractFeatures, FeatureCounts, InterpLogCondP, NLogCondP, NLogP,
    };

    fn count<E>(extractor: &E, parse: usize) -> Vec<(i32, f64)>
    where
        E: ExtractFeatures<Key = i32>,
    {
        // conditional probabilities 1/2, 1/4 and 1/4
        let sentence = sentence(&[
            (2f64.ln() - 10., "(S1 (NP (NN a)))"),
            (-10., "(S1 (NP (NN b)))"),
            (-10., "(S1 (NP (NN c)))"),
        ]);
        let mut counts = FeatureCounts::new();
        extractor.parse_featurecount(&sentence.parses()[parse], &mut counts);
        counts.into_iter().collect()
    }

    #[test]
    fn identifiers() {
        assert_eq!(NLogP.identifier(), "NLogP");
        assert_eq!(NLogCondP.identifier(), "NLogCondP");
        assert_eq!(BinnedLogCondP::default().identifier(), "BinnedLogCondP:7:2");
        assert_eq!(
            InterpLogCondP::new(5, 2.5).identifier(),
            "InterpLogCondP:5:2.5"
        );
    }

    #[test]
    fn log_probabilities() {
        let counts = count(&NLogP, 1);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].0, 0);
        assert_abs_diff_eq!(counts[0].1, 10., epsilon = 1e-9);

        let counts = count(&NLogCondP, 0);
        assert_abs_diff_eq!(counts[0].1, 2f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn binned_probabilities() {
        // -log2 1/2 = 1 and -log2 1/4 = 2, up to rounding
        let first = count(&BinnedLogCondP::default(), 0);
        assert!(first[0].0 == 1);
        assert_eq!(first[0].1, 1.);
        let second = count(&BinnedLogCondP::default(), 1);
        assert!(second[0].0 == 1 || second[0].0 == 2);

        let interp = count(&InterpLogCondP::default(), 1);
        assert_abs_diff_eq!(interp[0].1, 2., epsilon = 1e-9);
    }
}
