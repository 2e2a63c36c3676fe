//! Medicare domain profile.
//!
//! Covers IOM manuals, MCD (LCD/NCD) coverage determinations, and
//! HCPCS / ICD-10-CM code files. Operates at the federal level (no
//! state partitioning). Specialized queries are LCD/coverage-determination
//! queries, pinned to the `mcd` source.

use crate::config::RetrievalConfig;
use crate::domain::profile::{
    ChunkOverride, DomainProfile, compile_expansion_pairs, compile_pattern, compile_patterns,
};
use crate::error::Result;
use crate::topic::resolve_topic_pack;
use std::collections::BTreeMap;

const NAME: &str = "medicare";

const TOPIC_PACK: &str = include_str!("data/medicare_topics.json");

/// LCD/coverage-determination query detection.
const SPECIALIZED_QUERY_PATTERNS: &[&str] = &[
    r"\blcds?\b",
    r"\blocal coverage determination\b",
    r"\bcoverage determination\b",
    r"\bncd\b",
    r"\bnational coverage determination\b",
    r"\bmcd\b",
    r"\bcontractor\b",
    r"\bjurisdiction\b",
    r"\bnovitas\b",
    r"\bfirst coast\b",
    r"\bcgs\b",
    r"\bngs\b",
    r"\bwps\b",
    r"\bpalmetto\b",
    r"\bnoridian\b",
    r"\bj[a-l]\b",
    r"\bcover(?:ed)?\b.{0,40}\b(?:wound|hyperbaric|oxygen therapy|infusion|imaging|MRI|CT scan|ultrasound|physical therapy|cardiac rehab|chiropractic|acupuncture)\b",
    r"\bcoverage\b.{0,30}\b(?:wound|hyperbaric|oxygen|infusion|imaging|MRI|CT|physical therapy|cardiac|chiropractic|acupuncture|prosthetic|orthotic)\b",
    r"\b(?:wound|hyperbaric|oxygen therapy|infusion|imaging|MRI|CT scan|physical therapy|cardiac rehab)\b.{0,40}\bcover(?:ed)?\b",
];

const SPECIALIZED_TOPIC_PATTERNS: &[(&str, &str)] = &[
    (r"\bcardiac\s*rehab", "cardiac rehabilitation program coverage criteria"),
    (
        r"\bhyperbaric\s*oxygen",
        "hyperbaric oxygen therapy wound healing coverage indications",
    ),
    (r"\bphysical therapy", "outpatient physical therapy rehabilitation coverage"),
    (r"\b(?:wound\s*care|wound\s*vac)", "wound care negative pressure therapy coverage"),
    (
        r"\b(?:imaging|MRI|CT\s*scan)",
        "advanced diagnostic imaging coverage medical necessity",
    ),
];

const GENERIC_SPECIALIZED_EXPANSION: &str =
    "Local Coverage Determination LCD policy coverage criteria";

const STRIP_NOISE: &str = r"\b(?:lcd|lcds|ncd|mcd|local coverage determination|national coverage determination|coverage determination|novitas|first coast|cgs|ngs|wps|palmetto|noridian|contractor|jurisdiction|j[a-l])\b";

const STRIP_FILLER: &str = r"\b(?:does|have|has|an|the|for|is|are|what|which|apply to)\b";

const IOM_PATTERNS: &[&str] = &[
    r"\bpart\s+[a-d]\b",
    r"\biom\b",
    r"\binternet\s+only\s+manual\b",
    r"\bcms\s+manual\b",
    r"\bclaim(?:s)?\s*(?:processing|submission|filing)\b",
    r"\bbenefit(?:s)?\s*(?:policy|period)\b",
    r"\benrollment\b",
    r"\beligibility\b",
    r"\bmedicare\b.*\b(?:policy|guideline|manual|chapter|rule)\b",
    r"\bgeneral\s+billing\b",
    r"\bmsn\b",
    r"\bmedicare\s+summary\s+notice\b",
    r"\bappeal(?:s)?\b",
    r"\bredetermination\b",
];

const MCD_PATTERNS: &[&str] = &[
    r"\blcds?\b",
    r"\bncds?\b",
    r"\bcoverage\s+determination\b",
    r"\bmedical\s+necessity\b",
    r"\bcoverage\s+criteria\b",
    r"\bindication(?:s)?\b",
    r"\blimitation(?:s)?\b",
    r"\bcontractor\b",
    r"\bjurisdiction\b",
    r"\bmcd\b",
    r"\bnovitas\b",
    r"\bfirst\s+coast\b",
    r"\bpalmetto\b",
    r"\bnoridian\b",
    r"\bcovered?\b.{0,30}\bservice",
];

const CODES_PATTERNS: &[&str] = &[
    r"\bhcpcs\b",
    r"\bcpt\b",
    r"\bicd[- ]?10\b",
    r"\bprocedure\s+code\b",
    r"\bdiagnosis\s+code\b",
    r"\bbilling\s+code\b",
    r"\bcode(?:s)?\s+for\b",
    r"\bmodifier\b",
    r"\bdrg\b",
    r"\brevenue\s+code\b",
    r"\b[A-V]\d{4}\b",
];

const SYNONYM_MAP: &[(&str, &str)] = &[
    (r"\bcoverage\b", "covered services benefits policy"),
    (r"\bbilling\b", "claims reimbursement payment"),
    (r"\brehabilitation\b", "rehab therapy treatment program"),
    (r"\bwound\s*care\b", "wound management debridement negative pressure therapy"),
    (r"\bimaging\b", "diagnostic imaging MRI CT scan X-ray ultrasound"),
    (r"\bdurable\s+medical\s+equipment\b", "DME prosthetic orthotic supplies"),
    (r"\bhome\s+health\b", "home health agency HHA skilled nursing"),
    (r"\bhospice\b", "hospice palliative end-of-life terminal care"),
    (r"\bambulance\b", "ambulance transport emergency non-emergency"),
    (r"\binfusion\b", "infusion injection drug administration"),
    (r"\bphysical\s+therapy\b", "physical therapy PT outpatient rehabilitation"),
    (r"\boccupational\s+therapy\b", "occupational therapy OT rehabilitation"),
    (r"\bspeech\s+therapy\b", "speech-language pathology SLP therapy"),
    (r"\bmental\s+health\b", "behavioral health psychiatric psychological services"),
    (r"\bdialysis\b", "dialysis ESRD end-stage renal disease"),
    (r"\bchemotherapy\b", "chemotherapy oncology cancer treatment"),
];

const SYSTEM_PROMPT: &str = "You are a Medicare Revenue Cycle Management assistant. \
    Answer the user's question using ONLY the provided context. \
    Cite sources using [1], [2], etc. corresponding to the numbered context items. \
    If the context is insufficient to answer, say so explicitly. \
    This is not legal or medical advice.";

const QUICK_QUESTIONS: &[&str] = &[
    "What is Medicare timely filing?",
    "How does LCD coverage determination work?",
    "Explain modifier 59 usage",
    "What are HCPCS Level II codes?",
    "ICD-10-CM coding guidelines overview",
    "Medicare claims appeal process",
    "What is a National Coverage Determination?",
    "Outpatient prospective payment system basics",
];

/// Builds the Medicare profile.
///
/// # Errors
///
/// Returns an error when a pattern fails to compile or the topic pack is
/// malformed.
pub fn profile(config: &RetrievalConfig) -> Result<DomainProfile> {
    let source_expansions: BTreeMap<String, String> = [
        ("iom", "Medicare policy guidelines manual chapter benefit rules"),
        (
            "mcd",
            "coverage determination LCD NCD criteria medical necessity indications limitations",
        ),
        ("codes", "HCPCS CPT ICD-10 procedure diagnosis billing codes"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let default_source_relevance: BTreeMap<String, f64> =
        [("iom", 0.4), ("mcd", 0.3), ("codes", 0.3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

    let chunk_overrides: BTreeMap<String, ChunkOverride> = [(
        "mcd".to_string(),
        ChunkOverride {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        },
    )]
    .into_iter()
    .collect();

    Ok(DomainProfile {
        name: NAME.to_string(),
        display_name: "Medicare".to_string(),
        collection_name: "medicare".to_string(),
        source_kinds: vec!["iom".to_string(), "mcd".to_string(), "codes".to_string()],
        specialized_query_patterns: compile_patterns(NAME, SPECIALIZED_QUERY_PATTERNS)?,
        specialized_topic_patterns: compile_expansion_pairs(NAME, SPECIALIZED_TOPIC_PATTERNS)?,
        generic_specialized_expansion: GENERIC_SPECIALIZED_EXPANSION.to_string(),
        strip_noise_pattern: Some(compile_pattern(NAME, STRIP_NOISE)?),
        strip_filler_pattern: Some(compile_pattern(NAME, STRIP_FILLER)?),
        source_patterns: vec![
            ("iom".to_string(), compile_patterns(NAME, IOM_PATTERNS)?),
            ("mcd".to_string(), compile_patterns(NAME, MCD_PATTERNS)?),
            ("codes".to_string(), compile_patterns(NAME, CODES_PATTERNS)?),
        ],
        source_expansions,
        synonym_map: compile_expansion_pairs(NAME, SYNONYM_MAP)?,
        default_source_relevance,
        system_prompt: SYSTEM_PROMPT.to_string(),
        topics: resolve_topic_pack(NAME, config.topic_dir.as_deref(), TOPIC_PACK)?,
        specialized_source: Some("mcd".to_string()),
        specialized_k_floor: config.specialized_k,
        chunk_overrides,
        states: Vec::new(),
        quick_questions: QUICK_QUESTIONS.iter().map(|q| (*q).to_string()).collect(),
    })
}
