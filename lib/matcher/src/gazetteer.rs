//! Word lists behind the name and place detectors.
//!
//! A small built-in list covers common Chinese surnames, English names,
//! countries and Chinese administrative divisions. Deployments replace it
//! with a full list loaded from JSON.

use ahash::AHashSet;
use fieldfuse_core::tokenizer::{is_cjk, SimpleTokenizer};
use fieldfuse_core::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialized form of a gazetteer. Missing lists fall back to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GazetteerData {
    pub surnames: Vec<String>,
    pub given_names: Vec<String>,
    pub full_names: Vec<String>,
    pub english_names: Vec<String>,
    pub countries: Vec<String>,
    pub provinces: Vec<String>,
    pub cities: Vec<String>,
    pub counties: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    surnames: AHashSet<String>,
    max_surname_len: usize,
    given_names: AHashSet<String>,
    full_names: AHashSet<String>,
    english_names: AHashSet<String>,
    countries: AHashSet<String>,
    provinces: AHashSet<String>,
    cities: AHashSet<String>,
    counties: AHashSet<String>,
}

fn lowered(items: Vec<String>) -> AHashSet<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Gazetteer {
    pub fn from_data(data: GazetteerData) -> Self {
        let surnames = lowered(data.surnames);
        let max_surname_len = surnames.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        Self {
            surnames,
            max_surname_len,
            given_names: lowered(data.given_names),
            full_names: lowered(data.full_names),
            english_names: lowered(data.english_names),
            countries: lowered(data.countries),
            provinces: lowered(data.provinces),
            cities: lowered(data.cities),
            counties: lowered(data.counties),
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let data: GazetteerData = serde_json::from_str(&content)?;
        Ok(Self::from_data(data))
    }

    pub fn builtin() -> Self {
        Self::from_data(GazetteerData {
            surnames: owned(SURNAMES),
            given_names: Vec::new(),
            full_names: Vec::new(),
            english_names: owned(ENGLISH_NAMES),
            countries: owned(COUNTRIES),
            provinces: owned(PROVINCES),
            cities: owned(CITIES),
            counties: owned(COUNTIES),
        })
    }

    /// Surname followed by a given name. Without a given-name list any one
    /// or two ideographs are accepted as the given name.
    pub fn is_chinese_name(&self, text: &str) -> bool {
        let text = text.trim();
        if self.full_names.contains(text) {
            return true;
        }
        let chars: Vec<char> = text.chars().collect();
        if chars.len() < 2 || !chars.iter().all(|&c| is_cjk(c)) {
            return false;
        }
        let longest = self.max_surname_len.min(chars.len() - 1);
        (1..=longest).any(|i| {
            let surname: String = chars[..i].iter().collect();
            if !self.surnames.contains(&surname) {
                return false;
            }
            let given = &chars[i..];
            if self.given_names.is_empty() {
                given.len() <= 2
            } else {
                self.given_names.contains(&given.iter().collect::<String>())
            }
        })
    }

    /// Two or more words, every one a known English name.
    pub fn is_english_name(&self, text: &str) -> bool {
        let words: Vec<&str> = text.split_whitespace().collect();
        words.len() >= 2
            && words
                .iter()
                .all(|w| self.english_names.contains(&w.to_lowercase()))
    }

    pub fn mentions_country(&self, text: &str) -> bool {
        mentions(&self.countries, text)
    }

    pub fn mentions_province(&self, text: &str) -> bool {
        mentions(&self.provinces, text)
    }

    pub fn mentions_city(&self, text: &str) -> bool {
        mentions(&self.cities, text)
    }

    pub fn mentions_county(&self, text: &str) -> bool {
        mentions(&self.counties, text)
    }
}

/// Latin terms must equal an entry; ideograph runs must contain one.
fn mentions(set: &AHashSet<String>, text: &str) -> bool {
    SimpleTokenizer::tokenize(text).iter().any(|term| {
        let term = term.to_lowercase();
        if set.contains(&term) {
            return true;
        }
        term.chars().next().is_some_and(is_cjk) && set.iter().any(|entry| term.contains(entry.as_str()))
    })
}

const SURNAMES: &[&str] = &[
    "王", "李", "张", "刘", "陈", "杨", "黄", "赵", "吴", "周", "徐", "孙", "马", "朱", "胡", "郭",
    "何", "高", "林", "罗", "郑", "梁", "谢", "宋", "唐", "许", "韩", "冯", "邓", "曹", "彭", "曾",
    "肖", "田", "董", "袁", "潘", "于", "蒋", "蔡", "余", "杜", "叶", "程", "苏", "魏", "吕", "丁",
    "任", "沈", "姚", "卢", "姜", "崔", "钟", "谭", "陆", "汪", "范", "金", "石", "廖", "贾", "夏",
    "韦", "付", "方", "白", "邹", "孟", "熊", "秦", "邱", "江", "尹", "薛", "闫", "段", "雷", "侯",
    "龙", "史", "陶", "黎", "贺", "顾", "毛", "郝", "龚", "邵", "万", "钱", "严", "覃", "武", "戴",
    "莫", "孔", "向", "汤", "岑", "欧阳", "司马", "上官", "诸葛", "东方", "皇甫", "尉迟", "公孙",
    "慕容", "令狐", "夏侯", "长孙", "宇文", "司徒", "端木",
];

const ENGLISH_NAMES: &[&str] = &[
    "james", "john", "robert", "michael", "william", "david", "richard", "joseph", "thomas",
    "charles", "christopher", "daniel", "matthew", "anthony", "mark", "paul", "steven", "andrew",
    "kenneth", "george", "edward", "brian", "kevin", "jason", "mary", "patricia", "jennifer",
    "linda", "elizabeth", "barbara", "susan", "jessica", "sarah", "karen", "nancy", "lisa",
    "betty", "margaret", "sandra", "ashley", "emily", "donna", "michelle", "alice", "anna",
    "smith", "johnson", "williams", "brown", "jones", "garcia", "miller", "davis", "rodriguez",
    "martinez", "wilson", "anderson", "taylor", "moore", "jackson", "martin", "lee", "thompson",
    "white", "harris", "clark", "lewis", "robinson", "walker", "young", "allen", "king", "wright",
    "scott", "green", "baker", "adams", "nelson", "hill", "campbell", "mitchell", "carter",
];

const COUNTRIES: &[&str] = &[
    "中国", "美国", "英国", "法国", "德国", "日本", "韩国", "朝鲜", "俄罗斯", "印度", "加拿大",
    "澳大利亚", "新西兰", "意大利", "西班牙", "葡萄牙", "荷兰", "比利时", "瑞士", "瑞典", "挪威",
    "丹麦", "芬兰", "波兰", "希腊", "土耳其", "埃及", "南非", "巴西", "阿根廷", "墨西哥", "智利",
    "新加坡", "马来西亚", "泰国", "越南", "印度尼西亚", "菲律宾", "巴基斯坦", "蒙古",
    "china", "usa", "america", "england", "britain", "france", "germany", "japan", "korea",
    "russia", "india", "canada", "australia", "italy", "spain", "brazil", "mexico", "singapore",
];

const PROVINCES: &[&str] = &[
    "北京", "天津", "上海", "重庆", "河北", "山西", "辽宁", "吉林", "黑龙江", "江苏", "浙江",
    "安徽", "福建", "江西", "山东", "河南", "湖北", "湖南", "广东", "海南", "四川", "贵州",
    "云南", "陕西", "甘肃", "青海", "台湾", "内蒙古", "广西", "西藏", "宁夏", "新疆", "香港",
    "澳门",
];

const CITIES: &[&str] = &[
    "北京", "上海", "天津", "重庆", "广州", "深圳", "杭州", "南京", "苏州", "武汉", "成都",
    "西安", "长沙", "郑州", "济南", "青岛", "沈阳", "大连", "哈尔滨", "长春", "石家庄", "太原",
    "合肥", "福州", "厦门", "南昌", "昆明", "贵阳", "南宁", "海口", "兰州", "西宁", "银川",
    "乌鲁木齐", "拉萨", "呼和浩特", "宁波", "无锡", "温州", "佛山", "东莞", "珠海", "泉州",
    "烟台", "徐州", "洛阳", "桂林", "三亚",
];

const COUNTIES: &[&str] = &[
    "朝阳区", "海淀区", "东城区", "西城区", "丰台区", "昌平区", "浦东新区", "黄浦区", "徐汇区",
    "静安区", "闵行区", "天河区", "越秀区", "海珠区", "福田区", "南山区", "宝安区", "西湖区",
    "余杭区", "鼓楼区", "玄武区", "江宁区", "武昌区", "洪山区", "锦江区", "武侯区", "雁塔区",
    "岳麓区", "历下区", "市南区", "和平区", "南岗区", "昆山市", "江阴市", "义乌市", "晋江市",
    "慈溪市", "张家港市", "常熟市", "寿光市", "密云区", "延庆区", "崇明区", "长安区",
];
