//! Per-task aggregation of a single subject's sheet into named measures.

use crate::error::{AnalysisError, Result};
use crate::stats::{Ols, cov, follow_rts, mean, sd};
use clap::ValueEnum;
use cogbat_core::{Cell, SessionTable};

/// Named values one sheet contributes to a subject's summary row.
pub type Measures = Vec<(String, Cell)>;

/// Which trials feed the RT and regression measures of ANT, flanker and
/// Sternberg. Follow-error and follow-correct RTs always use every trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResponseFilter {
    #[default]
    Full,
    Correct,
    Incorrect,
}

impl ResponseFilter {
    fn keeps(self, correct: Option<bool>) -> bool {
        match self {
            Self::Full => true,
            Self::Correct => correct == Some(true),
            Self::Incorrect => correct == Some(false),
        }
    }
}

/// Column group of the summary table. Flanker data splits by mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Ant,
    DigitSpan,
    FlankerCompatible,
    FlankerIncompatible,
    Mrt,
    Ravens,
    Sart,
    Sternberg,
}

/// Aggregates one sheet. Sheets the analysis does not know are skipped.
pub fn aggregate(table: &SessionTable, filter: ResponseFilter) -> Result<Vec<(Group, Measures)>> {
    let sheet = Sheet(table);
    Ok(match table.sheet.as_str() {
        "ANT" => vec![(Group::Ant, ant(&sheet, filter)?)],
        "Digit span (backwards)" => vec![(Group::DigitSpan, accuracy(&sheet, "digit", "correct_count", "correct_prop")?)],
        "Eriksen Flanker" => flanker(&sheet, filter)?,
        "MRT" => vec![(Group::Mrt, accuracy(&sheet, "mrt", "count", "prop")?)],
        "Ravens Matrices" => vec![(Group::Ravens, ravens(&sheet)?)],
        "SART" => vec![(Group::Sart, sart(&sheet)?)],
        "Sternberg" => vec![(Group::Sternberg, sternberg(&sheet, filter)?)],
        other => {
            tracing::warn!(sheet = other, "no aggregation for sheet, skipping");
            Vec::new()
        }
    })
}

struct Sheet<'a>(&'a SessionTable);

impl Sheet<'_> {
    fn cells(&self, column: &str) -> Result<Vec<&Cell>> {
        self.0.column(column).ok_or_else(|| AnalysisError::MissingColumn {
            sheet: self.0.sheet.clone(),
            column: column.to_string(),
        })
    }

    fn numbers(&self, column: &str) -> Result<Vec<Option<f64>>> {
        self.cells(column)?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Cell::Na => Ok(None),
                other => other.as_f64().map(Some).ok_or_else(|| AnalysisError::BadValue {
                    sheet: self.0.sheet.clone(),
                    column: column.to_string(),
                    row: row + 1,
                    value: other.to_string(),
                }),
            })
            .collect()
    }

    fn flags(&self, column: &str) -> Result<Vec<Option<bool>>> {
        Ok(self.numbers(column)?.into_iter().map(|v| v.map(|v| v != 0.0)).collect())
    }

    fn labels(&self, column: &str) -> Result<Vec<String>> {
        Ok(self.cells(column)?.into_iter().map(Cell::to_string).collect())
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

struct Out {
    prefix: &'static str,
    measures: Measures,
}

impl Out {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            measures: Vec::new(),
        }
    }

    fn put(&mut self, name: &str, value: impl Into<Cell>) {
        self.measures.push((format!("{}_{name}", self.prefix), value.into()));
    }

    /// `{level}_rt` for every level, then `_rtsd`, `_rtcov` and `_correct`.
    fn levels(&mut self, levels: &[(&str, Level)]) {
        for (name, l) in levels {
            self.put(&format!("{name}_rt"), mean(&l.rts));
        }
        for (name, l) in levels {
            self.put(&format!("{name}_rtsd"), sd(&l.rts));
        }
        for (name, l) in levels {
            self.put(&format!("{name}_rtcov"), cov(&l.rts));
        }
        for (name, l) in levels {
            self.put(&format!("{name}_correct"), l.correct);
        }
    }

    fn regression(&mut self, name: &str, fit: Ols, reference_mean: f64) {
        self.put(&format!("{name}intercept"), fit.intercept);
        self.put(&format!("{name}slope"), fit.slope);
        self.put(&format!("{name}slope_norm"), fit.slope / reference_mean);
    }
}

#[derive(Debug, Default)]
struct Level {
    rts: Vec<f64>,
    correct: i64,
}

/// One RT trial after the response filter.
struct RtTrial {
    rt: Option<f64>,
    correct: Option<bool>,
    condition: String,
}

fn level<'a>(trials: impl IntoIterator<Item = &'a RtTrial>) -> Level {
    let mut out = Level::default();
    for t in trials {
        out.rts.extend(t.rt);
        out.correct += i64::from(t.correct == Some(true));
    }
    out
}

fn level_of(trials: &[RtTrial], condition: &str) -> Level {
    level(trials.iter().filter(|t| t.condition == condition))
}

fn rts_of(trials: &[RtTrial], condition: &str) -> Vec<f64> {
    trials.iter().filter(|t| t.condition == condition).filter_map(|t| t.rt).collect()
}

fn proportion(count: i64, items: usize) -> f64 {
    if items == 0 {
        f64::NAN
    } else {
        count as f64 / items as f64
    }
}

fn correct_count(sheet: &Sheet<'_>, column: &str) -> Result<i64> {
    Ok(sheet.flags(column)?.into_iter().filter(|c| *c == Some(true)).count() as i64)
}

fn accuracy(sheet: &Sheet<'_>, prefix: &'static str, count: &str, prop: &str) -> Result<Measures> {
    let n = correct_count(sheet, "correct")?;
    let mut out = Out::new(prefix);
    out.put(count, n);
    out.put(prop, proportion(n, sheet.len()));
    out.put("num_items", sheet.len());
    Ok(out.measures)
}

fn ravens(sheet: &Sheet<'_>) -> Result<Measures> {
    let rts: Vec<f64> = sheet.numbers("RT")?.into_iter().flatten().collect();
    let n = correct_count(sheet, "correct")?;
    let mut out = Out::new("ravens");
    out.put("rt", mean(&rts));
    out.put("count", n);
    out.put("prop", proportion(n, sheet.len()));
    out.put("num_items", sheet.len());
    Ok(out.measures)
}

fn sart(sheet: &Sheet<'_>) -> Result<Measures> {
    let rt = sheet.numbers("RT")?;
    let accuracy = sheet.flags("accuracy")?;
    let stimulus = sheet.numbers("stimulus")?;
    let pressed = sheet.flags("key press")?;
    let (follow_error, follow_correct) = follow_rts(&accuracy, &rt);

    let is_target = |i: usize| stimulus[i] == Some(3.0);
    let rts_where = |keep: &dyn Fn(usize) -> bool| -> Vec<f64> {
        (0..rt.len()).filter(|&i| keep(i)).filter_map(|i| rt[i]).collect()
    };
    let total = rts_where(&|_| true);
    let frequent = rts_where(&|i| !is_target(i));
    let infrequent = rts_where(&is_target);
    let targets = (0..stimulus.len()).filter(|&i| is_target(i)).count();
    let errors = (0..stimulus.len())
        .filter(|&i| is_target(i) && pressed[i] == Some(true))
        .count() as i64;

    let mut out = Out::new("sart");
    out.put("follow_error_rt", follow_error);
    out.put("follow_correct_rt", follow_correct);
    for (name, rts) in [("total", &total), ("frequent", &frequent), ("infrequent", &infrequent)] {
        out.put(&format!("{name}_rt"), mean(rts));
        out.put(&format!("{name}_rtsd"), sd(rts));
        out.put(&format!("{name}_rtcov"), cov(rts));
    }
    out.put("error_count", errors);
    out.put("errors_prop", proportion(errors, targets));
    out.put("errors_num_items", targets);
    Ok(out.measures)
}

/// Reads RT and correctness for every row, returning follow RTs over all
/// rows plus the filtered trials labelled by `condition`.
fn rt_trials(
    sheet: &Sheet<'_>,
    condition: Vec<String>,
    filter: ResponseFilter,
) -> Result<((f64, f64), Vec<RtTrial>)> {
    let rt = sheet.numbers("RT")?;
    let correct = sheet.flags("correct")?;
    let follow = follow_rts(&correct, &rt);
    let trials = rt
        .into_iter()
        .zip(correct)
        .zip(condition)
        .map(|((rt, correct), condition)| RtTrial { rt, correct, condition })
        .filter(|t| filter.keeps(t.correct))
        .collect();
    Ok((follow, trials))
}

fn ant(sheet: &Sheet<'_>, filter: ResponseFilter) -> Result<Measures> {
    let ((follow_error, follow_correct), by_congruency) = rt_trials(sheet, sheet.labels("congruency")?, filter)?;
    let (_, by_cue) = rt_trials(sheet, sheet.labels("cue")?, filter)?;

    let mut out = Out::new("ant");
    out.put("follow_error_rt", follow_error);
    out.put("follow_correct_rt", follow_correct);
    let congruency: Vec<(&str, Level)> = ["neutral", "congruent", "incongruent"]
        .into_iter()
        .map(|c| (c, level_of(&by_congruency, c)))
        .collect();
    out.levels(&congruency);
    let cue: Vec<(&str, Level)> = ["nocue", "center", "spatial", "double"]
        .into_iter()
        .map(|c| (c, level_of(&by_cue, c)))
        .collect();
    out.levels(&cue);

    let congruent_rt = mean(&rts_of(&by_congruency, "congruent"));
    let double_rt = mean(&rts_of(&by_cue, "double"));
    let spatial_rt = mean(&rts_of(&by_cue, "spatial"));
    out.regression(
        "conflict_",
        Ols::treatment(&rts_of(&by_congruency, "congruent"), &rts_of(&by_congruency, "incongruent")),
        congruent_rt,
    );
    out.regression(
        "alerting_",
        Ols::treatment(&rts_of(&by_cue, "double"), &rts_of(&by_cue, "nocue")),
        double_rt,
    );
    out.regression(
        "orienting_",
        Ols::treatment(&rts_of(&by_cue, "spatial"), &rts_of(&by_cue, "center")),
        spatial_rt,
    );
    Ok(out.measures)
}

fn sternberg(sheet: &Sheet<'_>, filter: ResponseFilter) -> Result<Measures> {
    let sizes = sheet.labels("setSize")?;
    let ((follow_error, follow_correct), trials) = rt_trials(sheet, sizes, filter)?;

    let mut out = Out::new("stern");
    out.put("follow_error_rt", follow_error);
    out.put("follow_correct_rt", follow_correct);
    out.levels(&[("set_2", level_of(&trials, "2")), ("set_6", level_of(&trials, "6"))]);
    let set_2 = rts_of(&trials, "2");
    let set_2_rt = mean(&set_2);
    out.regression("", Ols::treatment(&set_2, &rts_of(&trials, "6")), set_2_rt);
    Ok(out.measures)
}

/// One group per compatibility mapping present in the sheet.
fn flanker(sheet: &Sheet<'_>, filter: ResponseFilter) -> Result<Vec<(Group, Measures)>> {
    let compat = sheet.labels("compatibility")?;
    let rt = sheet.numbers("RT")?;
    let correct = sheet.flags("correct")?;
    let congruency = sheet.labels("congruency")?;

    let mut groups = Vec::new();
    for (label, group, prefix) in [
        ("compatible", Group::FlankerCompatible, "flanker_compat"),
        ("incompatible", Group::FlankerIncompatible, "flanker_incompat"),
    ] {
        let rows: Vec<usize> = (0..compat.len()).filter(|&i| compat[i] == label).collect();
        if rows.is_empty() {
            continue;
        }
        let sub_rt: Vec<Option<f64>> = rows.iter().map(|&i| rt[i]).collect();
        let sub_correct: Vec<Option<bool>> = rows.iter().map(|&i| correct[i]).collect();
        let (follow_error, follow_correct) = follow_rts(&sub_correct, &sub_rt);
        let trials: Vec<RtTrial> = rows
            .iter()
            .map(|&i| RtTrial {
                rt: rt[i],
                correct: correct[i],
                condition: congruency[i].clone(),
            })
            .filter(|t| filter.keeps(t.correct))
            .collect();

        let mut out = Out::new(prefix);
        out.put("follow_error_rt", follow_error);
        out.put("follow_correct_rt", follow_correct);
        out.levels(&[
            ("congruent", level_of(&trials, "congruent")),
            ("incongruent", level_of(&trials, "incongruent")),
        ]);
        let congruent = rts_of(&trials, "congruent");
        let congruent_rt = mean(&congruent);
        out.regression(
            "conflict_",
            Ols::treatment(&congruent, &rts_of(&trials, "incongruent")),
            congruent_rt,
        );
        groups.push((group, out.measures));
    }
    Ok(groups)
}
