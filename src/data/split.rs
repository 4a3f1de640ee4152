//! Train/test partitioning by calendar year.
//!
//! Every observation lands on exactly one side: years `<= split_year` train the
//! model, years `> split_year` are held out for scoring. Row order is preserved
//! within each side.

use crate::domain::Dataset;

/// The two halves of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Partition `dataset` into train (`year <= split_year`) and test (`year > split_year`).
pub fn train_test_split(dataset: &Dataset, split_year: i32) -> Split {
    let (train, test): (Vec<_>, Vec<_>) = dataset
        .observations
        .iter()
        .cloned()
        .partition(|o| o.year() <= split_year);

    tracing::info!(
        split_year,
        train_rows = train.len(),
        test_rows = test.len(),
        "split dataset"
    );

    Split {
        train: dataset.with_observations(train),
        test: dataset.with_observations(test),
    }
}
