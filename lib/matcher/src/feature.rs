//! Value-type detectors
//!
//! A [`Detector`] recognises one kind of value (an integer, a date, a phone
//! number, a personal name...). Each carries:
//!
//! - `types`: ordered type labels, most general last. Weight recorded under
//!   an earlier label is folded into a later one if the later one has any
//!   evidence of its own.
//! - `categories`: detectors sharing a category are checked together once
//!   one of them matches a value.
//! - `labels`: field-name hints used to rank detectors for a given field.
//! - `weight`: contribution of one matching value.
//!
//! The [`DetectorRegistry`] is built once at startup and rejects any category
//! in which two detectors share a primary type.

use crate::gazetteer::Gazetteer;
use ahash::{AHashMap, AHashSet};
use fieldfuse_core::{Error, Result};
use regex::Regex;
use std::sync::Arc;

const INTEGER: &str = r"^[+-]?\d+$";
const DECIMAL: &str = r"^[+-]?(\d+\.\d*|\d*\.\d+)([eE][+-]?\d+)?$";
const CITIZEN_ID: &str =
    r"^[1-9]\d{5}(18|19|20)\d{2}((0[1-9])|(10|11|12))(([0-2][1-9])|10|20|30|31)\d{3}[0-9Xx]$";
const TIME: &str = r"(([01]?[0-9])|(20)|(21)|(22)|(23)):[0-5][0-9](:[0-5][0-9])?";
const DATE: &str = r"\d{4}\s*[-/\\.年]\s*((0?[1-9])|10|11|12)\s*[-/\\.月]\s*(([0-2]?[1-9])|10|20|30|31)日?";
const WEEK: &str = r"(星期|周)[一二三四五六日]";
const PHONE: &str = r"^1(?:3\d|4[4-9]|5[0-35-9]|6[67]|7[013-8]|8\d|9\d)\d{8}$";

const BOOL_VALUES: &[&str] = &["是", "否", "true", "false", "yes", "no", "有", "无"];
const GENDER_VALUES: &[&str] = &["男", "女", "女改男", "男改女"];

/// How a detector decides whether a value belongs to it.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Whole trimmed value matches the pattern.
    Pattern(Regex),
    /// Trimmed, lowercased value is one of the listed words.
    OneOf(Vec<String>),
    /// A time together with a date or weekday.
    DateTime { time: Regex, date: Regex, week: Regex },
    /// A date together with a weekday and no time.
    DateWeek { time: Regex, date: Regex, week: Regex },
    ChineseName,
    EnglishName,
    Country,
    Province,
    City,
    County,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Configuration(format!("invalid pattern {}: {}", pattern, e)))
}

fn anchored(pattern: &str) -> Result<Regex> {
    compile(&format!("^(?:{})$", pattern))
}

impl Rule {
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Rule::Pattern(compile(pattern)?))
    }

    pub fn one_of(words: &[&str]) -> Self {
        Rule::OneOf(words.iter().map(|w| w.to_lowercase()).collect())
    }

    fn date_time() -> Result<Self> {
        Ok(Rule::DateTime {
            time: compile(TIME)?,
            date: compile(DATE)?,
            week: compile(WEEK)?,
        })
    }

    fn date_week() -> Result<Self> {
        Ok(Rule::DateWeek {
            time: compile(TIME)?,
            date: compile(DATE)?,
            week: compile(WEEK)?,
        })
    }

    fn matches(&self, value: &str, gazetteer: &Gazetteer) -> bool {
        match self {
            Rule::Pattern(re) => re.is_match(value.trim()),
            Rule::OneOf(words) => {
                let v = value.trim().to_lowercase();
                words.iter().any(|w| *w == v)
            }
            Rule::DateTime { time, date, week } => {
                time.is_match(value) && (week.is_match(value) || date.is_match(value))
            }
            Rule::DateWeek { time, date, week } => {
                week.is_match(value) && date.is_match(value) && !time.is_match(value)
            }
            Rule::ChineseName => gazetteer.is_chinese_name(value),
            Rule::EnglishName => gazetteer.is_english_name(value),
            Rule::Country => gazetteer.mentions_country(value),
            Rule::Province => gazetteer.mentions_province(value),
            Rule::City => gazetteer.mentions_city(value),
            Rule::County => gazetteer.mentions_county(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Detector {
    pub name: String,
    pub types: Vec<String>,
    pub categories: Vec<String>,
    pub labels: Vec<String>,
    pub weight: u32,
    pub rule: Rule,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Detector {
    pub fn new(
        name: &str,
        types: &[&str],
        categories: &[&str],
        labels: &[&str],
        weight: u32,
        rule: Rule,
    ) -> Result<Self> {
        if types.is_empty() || categories.is_empty() || labels.is_empty() {
            return Err(Error::Configuration(format!(
                "detector {} needs at least one type, category and label",
                name
            )));
        }
        if weight == 0 {
            return Err(Error::Configuration(format!("detector {} has zero weight", name)));
        }
        Ok(Self {
            name: name.to_string(),
            types: strings(types),
            categories: strings(categories),
            labels: strings(labels),
            weight,
            rule,
        })
    }

    #[inline]
    #[must_use]
    pub fn primary_type(&self) -> &str {
        &self.types[0]
    }
}

/// The built-in detector catalogue, in declaration order.
pub fn builtin_detectors() -> Result<Vec<Detector>> {
    Ok(vec![
        Detector::new("integer", &["integer", "decimal"], &["integer"], &["整数", "编号", "号码", "编码"], 1, Rule::pattern(INTEGER)?)?,
        Detector::new("decimal", &["decimal"], &["decimal"], &["小数"], 1, Rule::pattern(DECIMAL)?)?,
        Detector::new("bool", &["bool"], &["bool"], &["是否", "有无"], 1, Rule::one_of(BOOL_VALUES))?,
        Detector::new("citizen_id", &["citizen_id"], &["integer"], &["公民身份号码", "身份证", "身份号码", "身份证号码"], 3, Rule::pattern(CITIZEN_ID)?)?,
        Detector::new("time", &["time"], &["time"], &["时间", "时刻"], 3, Rule::Pattern(anchored(TIME)?))?,
        Detector::new("date", &["date"], &["date"], &["日期"], 3, Rule::Pattern(anchored(DATE)?))?,
        Detector::new("week", &["week"], &["week"], &["星期", "周"], 3, Rule::Pattern(anchored(WEEK)?))?,
        Detector::new("date_time", &["time"], &["date_time"], &["时间", "时刻"], 3, Rule::date_time()?)?,
        Detector::new("date_week", &["date"], &["date_week"], &["星期", "日期"], 3, Rule::date_week()?)?,
        Detector::new("chinese_name", &["chinese_name"], &["string"], &["姓名", "名字"], 3, Rule::ChineseName)?,
        Detector::new("english_name", &["english_name"], &["string"], &["姓名", "名字"], 3, Rule::EnglishName)?,
        Detector::new("phone_number", &["phone_number"], &["integer"], &["联系方式", "手机号码", "电话号码"], 3, Rule::pattern(PHONE)?)?,
        Detector::new("gender", &["gender"], &["gender"], &["性别"], 3, Rule::one_of(GENDER_VALUES))?,
        Detector::new("country", &["country"], &["string"], &["国家", "国籍"], 2, Rule::Country)?,
        Detector::new("province", &["province"], &["string"], &["省", "省级行政区", "省份"], 2, Rule::Province)?,
        Detector::new("city", &["city"], &["string"], &["城市"], 2, Rule::City)?,
        Detector::new("county", &["county"], &["string"], &["县", "区", "县区", "县级市"], 3, Rule::County)?,
    ])
}

/// Validated, immutable set of detectors with the lookup tables the
/// classifier needs.
#[derive(Debug)]
pub struct DetectorRegistry {
    detectors: Vec<Detector>,
    gazetteer: Arc<Gazetteer>,
    type_labels: Arc<Vec<String>>,
    /// Per detector: indices of its `types` into `type_labels`.
    chains: Vec<Vec<usize>>,
    /// Per detector: every detector sharing at least one category.
    peers: Vec<Vec<usize>>,
    /// Distinct labels in first-declared order with their detectors.
    labels: Vec<(String, Vec<usize>)>,
}

impl DetectorRegistry {
    pub fn new(detectors: Vec<Detector>, gazetteer: Arc<Gazetteer>) -> Result<Self> {
        let mut by_category: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, detector) in detectors.iter().enumerate() {
            for category in &detector.categories {
                match by_category.iter_mut().find(|(c, _)| c == category) {
                    Some((_, members)) => members.push(index),
                    None => by_category.push((category.clone(), vec![index])),
                }
            }
        }

        for (category, members) in &by_category {
            let mut primaries = AHashSet::new();
            for &index in members {
                let detector = &detectors[index];
                if !primaries.insert(detector.primary_type()) {
                    return Err(Error::Configuration(format!(
                        "category {} has two detectors with primary type {} ({})",
                        category,
                        detector.primary_type(),
                        detector.name
                    )));
                }
            }
        }

        let mut type_labels: Vec<String> = Vec::new();
        let mut type_index: AHashMap<String, usize> = AHashMap::new();
        let mut chains = Vec::with_capacity(detectors.len());
        for detector in &detectors {
            let chain = detector
                .types
                .iter()
                .map(|t| {
                    *type_index.entry(t.clone()).or_insert_with(|| {
                        type_labels.push(t.clone());
                        type_labels.len() - 1
                    })
                })
                .collect();
            chains.push(chain);
        }

        let peers = detectors
            .iter()
            .map(|detector| {
                let mut set: Vec<usize> = by_category
                    .iter()
                    .filter(|(c, _)| detector.categories.contains(c))
                    .flat_map(|(_, members)| members.iter().copied())
                    .collect();
                set.sort_unstable();
                set.dedup();
                set
            })
            .collect();

        let mut labels: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, detector) in detectors.iter().enumerate() {
            for label in &detector.labels {
                match labels.iter_mut().find(|(l, _)| l == label) {
                    Some((_, members)) => members.push(index),
                    None => labels.push((label.clone(), vec![index])),
                }
            }
        }

        Ok(Self {
            detectors,
            gazetteer,
            type_labels: Arc::new(type_labels),
            chains,
            peers,
            labels,
        })
    }

    pub fn builtin(gazetteer: Arc<Gazetteer>) -> Result<Self> {
        Self::new(builtin_detectors()?, gazetteer)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn detector(&self, index: usize) -> &Detector {
        &self.detectors[index]
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Distinct type labels in a fixed order. Profiles are vectors over it.
    pub fn type_labels(&self) -> &Arc<Vec<String>> {
        &self.type_labels
    }

    pub fn type_index(&self, label: &str) -> Option<usize> {
        self.type_labels.iter().position(|t| t == label)
    }

    pub(crate) fn chain(&self, index: usize) -> &[usize] {
        &self.chains[index]
    }

    pub(crate) fn peers(&self, index: usize) -> &[usize] {
        &self.peers[index]
    }

    pub(crate) fn labels(&self) -> &[(String, Vec<usize>)] {
        &self.labels
    }

    #[inline]
    pub fn matches(&self, index: usize, value: &str) -> bool {
        self.detectors[index].rule.matches(value, &self.gazetteer)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.detectors.iter().position(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DetectorRegistry {
        DetectorRegistry::builtin(Arc::new(Gazetteer::builtin())).unwrap()
    }

    fn check(registry: &DetectorRegistry, name: &str, value: &str) -> bool {
        registry.matches(registry.find(name).unwrap(), value)
    }

    #[test]
    fn test_builtin_registry_is_valid() {
        let r = registry();
        assert_eq!(r.len(), 17);
        // combined detectors reuse primary types, so labels are fewer than detectors
        assert_eq!(r.type_labels().len(), 15);
        assert_eq!(r.type_labels()[0], "integer");
        assert_eq!(r.type_labels()[1], "decimal");
    }

    #[test]
    fn test_duplicate_primary_in_category_rejected() {
        let detectors = vec![
            Detector::new("a", &["integer"], &["numbers"], &["a"], 1, Rule::pattern(INTEGER).unwrap()).unwrap(),
            Detector::new("b", &["integer", "decimal"], &["numbers"], &["b"], 1, Rule::pattern(DECIMAL).unwrap()).unwrap(),
        ];
        let err = DetectorRegistry::new(detectors, Arc::new(Gazetteer::default())).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_detector_needs_labels() {
        assert!(Detector::new("x", &["x"], &["x"], &[], 1, Rule::ChineseName).is_err());
        assert!(Detector::new("x", &["x"], &["x"], &["x"], 0, Rule::ChineseName).is_err());
    }

    #[test]
    fn test_numbers() {
        let r = registry();
        assert!(check(&r, "integer", " -42 "));
        assert!(!check(&r, "integer", "4.2"));
        assert!(check(&r, "decimal", "4.2"));
        assert!(check(&r, "decimal", ".5e10"));
        assert!(!check(&r, "decimal", "42"));
        assert!(!check(&r, "decimal", "abc.5"));
    }

    #[test]
    fn test_identity_and_phone() {
        let r = registry();
        assert!(check(&r, "citizen_id", "11010519491231002X"));
        assert!(!check(&r, "citizen_id", "110105194913310021"));
        assert!(check(&r, "phone_number", "13812345678"));
        assert!(!check(&r, "phone_number", "12812345678"));
    }

    #[test]
    fn test_time_and_dates() {
        let r = registry();
        assert!(check(&r, "time", "23:59"));
        assert!(check(&r, "time", "8:05:30"));
        assert!(!check(&r, "time", "24:00"));
        assert!(check(&r, "date", "2019-2-27"));
        assert!(check(&r, "date", "2019年2月27日"));
        assert!(check(&r, "week", "星期三"));
        assert!(check(&r, "date_time", "2019-02-27 10:30"));
        assert!(check(&r, "date_time", "周三 10:30"));
        assert!(!check(&r, "date_time", "10:30"));
        assert!(check(&r, "date_week", "2019-02-27 星期三"));
        assert!(!check(&r, "date_week", "2019-02-27 星期三 10:30"));
    }

    #[test]
    fn test_word_lists() {
        let r = registry();
        assert!(check(&r, "bool", " YES "));
        assert!(check(&r, "gender", "女改男"));
        assert!(!check(&r, "gender", "unknown"));
    }

    #[test]
    fn test_peers_share_category() {
        let r = registry();
        let integer = r.find("integer").unwrap();
        let peers: Vec<&str> = r.peers(integer).iter().map(|&i| r.detector(i).name.as_str()).collect();
        assert_eq!(peers, vec!["integer", "citizen_id", "phone_number"]);
    }

    #[test]
    fn test_integer_chain_refines_to_decimal() {
        let r = registry();
        let chain = r.chain(r.find("integer").unwrap());
        assert_eq!(chain.len(), 2);
        assert_eq!(r.type_labels()[chain[1]], "decimal");
    }
}
