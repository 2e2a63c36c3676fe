//! US auto insurance domain profile.
//!
//! Covers state regulations, policy forms, claims handling, and rate
//! filing data for the top US auto insurance markets. Specialized queries
//! are coverage-specific questions, pinned to the `regulations` source.

use crate::config::RetrievalConfig;
use crate::domain::profile::{
    ChunkOverride, DomainProfile, compile_expansion_pairs, compile_pattern, compile_patterns,
};
use crate::error::Result;
use crate::topic::resolve_topic_pack;
use std::collections::BTreeMap;

const NAME: &str = "auto";

const TOPIC_PACK: &str = include_str!("data/auto_topics.json");

/// Coverage-specific query detection.
const SPECIALIZED_QUERY_PATTERNS: &[&str] = &[
    r"\bliability\s+(?:limit|coverage|minimum)\b",
    r"\bmin(?:imum)?\s+(?:coverage|liability|limits?)\b",
    r"\bbodily\s+injury\b",
    r"\bproperty\s+damage\b",
    r"\buninsured\s+motorist\b",
    r"\bunderinsured\s+motorist\b",
    r"\b(?:UM|UIM)\b",
    r"\bpersonal\s+injury\s+protection\b",
    r"\bPIP\b",
    r"\bno[- ]fault\b",
    r"\btort\s+(?:system|state|threshold)\b",
    r"\bcollision\s+coverage\b",
    r"\bcomprehensive\s+coverage\b",
    r"\bMedPay\b",
    r"\bmedical\s+payments?\b",
    r"\bgap\s+insurance\b",
    r"\brental\s+(?:car|reimbursement)\b",
    r"\btowing\b",
    r"\broadside\s+assistance\b",
];

const SPECIALIZED_TOPIC_PATTERNS: &[(&str, &str)] = &[
    (r"\bliability\b", "bodily injury property damage liability coverage limits minimum"),
    (r"\bPIP|personal injury protection\b", "PIP no-fault medical expenses lost wages"),
    (r"\bcollision\b", "collision coverage deductible accident damage repair"),
    (r"\bcomprehensive\b", "comprehensive coverage theft vandalism weather hail flood"),
    (r"\buninsured|underinsured|UM|UIM\b", "uninsured underinsured motorist coverage gap"),
    (r"\bsubrogation\b", "subrogation recovery third-party claim reimbursement"),
];

const GENERIC_SPECIALIZED_EXPANSION: &str =
    "state insurance regulation coverage requirement minimum limits";

const STRIP_NOISE: &str =
    r"\b(?:auto insurance|car insurance|vehicle insurance|motor vehicle|automobile|policy)\b";

const STRIP_FILLER: &str =
    r"\b(?:does|have|has|an|the|for|is|are|what|which|apply to|do i need)\b";

const REGULATIONS_PATTERNS: &[&str] = &[
    r"\bregulat(?:ion|ory|e)\b",
    r"\bstatute\b",
    r"\binsurance\s+code\b",
    r"\bDOI\b",
    r"\bdepartment\s+of\s+insurance\b",
    r"\binsurance\s+commissioner\b",
    r"\bstate\s+law\b",
    r"\bstate\s+require(?:ment|d)?\b",
    r"\bmandatory\b",
    r"\bcompulsory\b",
    r"\bfinancial\s+responsibility\b",
    r"\bNAIC\b",
    r"\bmodel\s+(?:law|regulation|act)\b",
];

const FORMS_PATTERNS: &[&str] = &[
    r"\bpolicy\s+form\b",
    r"\bendorsement\b",
    r"\bISO\b",
    r"\bdeclarations?\s+page\b",
    r"\bpersonal\s+auto\s+policy\b",
    r"\bPAP\b",
    r"\bcommercial\s+auto\b",
    r"\bBAP\b",
    r"\bcoverage\s+(?:part|form)\b",
    r"\bexclusion\b",
    r"\bconditions?\s+(?:section|clause)\b",
];

const CLAIMS_PATTERNS: &[&str] = &[
    r"\bclaim(?:s)?\s*(?:process|handling|settlement|adjustment)\b",
    r"\badjuster\b",
    r"\btotal\s+loss\b",
    r"\bsalvage\b",
    r"\bsubrogation\b",
    r"\bfraud\b",
    r"\bSIU\b",
    r"\bspecial\s+investigation\b",
    r"\bappraisal\b",
    r"\barbitration\b",
    r"\bdiminished\s+value\b",
];

const RATES_PATTERNS: &[&str] = &[
    r"\brate\s+(?:filing|increase|change|factor)\b",
    r"\bpremium\b",
    r"\bunderwriting\b",
    r"\brisk\s+(?:factor|classification|assessment)\b",
    r"\bactuarial\b",
    r"\bloss\s+ratio\b",
    r"\bcredit\s+(?:score|based|factor)\b",
    r"\btelematics\b",
    r"\busage[- ]based\b",
    r"\bdiscount\b",
    r"\bsurcharge\b",
];

const SYNONYM_MAP: &[(&str, &str)] = &[
    (r"\bliability\b", "bodily injury property damage third-party coverage"),
    (r"\bcollision\b", "collision accident damage repair deductible"),
    (r"\bcomprehensive\b", "comprehensive theft vandalism weather hail flood fire"),
    (r"\bPIP\b", "personal injury protection no-fault medical expenses lost wages"),
    (r"\bUM\b", "uninsured motorist coverage gap protection"),
    (r"\bUIM\b", "underinsured motorist coverage additional protection"),
    (r"\bpremium\b", "premium rate cost price payment installment"),
    (r"\bdeductible\b", "deductible out-of-pocket self-insured retention"),
    (r"\btotal\s+loss\b", "total loss salvage actual cash value replacement"),
    (r"\bsubrogation\b", "subrogation recovery reimbursement third-party"),
    (r"\bfraud\b", "fraud staged accident investigation SIU"),
    (r"\bsurcharge\b", "surcharge points violation accident penalty"),
    (r"\bdiscount\b", "discount safe driver multi-policy bundling good student"),
    (r"\bgap\s+insurance\b", "gap insurance loan payoff depreciation difference"),
];

const SYSTEM_PROMPT: &str = "You are a US auto insurance specialist. \
    Answer the user's question using ONLY the provided context. \
    When relevant, note state-specific requirements and variations. \
    Cite sources using [1], [2], etc. corresponding to the numbered context items. \
    If the context is insufficient to answer, say so explicitly. \
    This is not legal or financial advice.";

/// Top US auto insurance markets by written premium.
const TOP_MARKETS: &[&str] = &[
    "CA", "TX", "FL", "NY", "PA", "IL", "OH", "GA", "NC", "MI", "NJ", "VA", "WA", "AZ", "MA",
];

const QUICK_QUESTIONS: &[&str] = &[
    "What are California's minimum auto liability limits?",
    "How does no-fault insurance work in Florida?",
    "What is PIP coverage and which states require it?",
    "Explain the difference between collision and comprehensive coverage",
    "What are uninsured/underinsured motorist requirements by state?",
    "How does the subrogation process work in auto claims?",
    "What factors affect auto insurance premiums?",
    "What is the tort vs no-fault system for auto insurance?",
];

/// Builds the auto insurance profile.
///
/// # Errors
///
/// Returns an error when a pattern fails to compile or the topic pack is
/// malformed.
pub fn profile(config: &RetrievalConfig) -> Result<DomainProfile> {
    let source_expansions: BTreeMap<String, String> = [
        (
            "regulations",
            "state insurance regulation statute DOI requirement financial responsibility law",
        ),
        ("forms", "policy form endorsement ISO PAP coverage declarations exclusion conditions"),
        (
            "claims",
            "claims handling adjustment settlement subrogation total loss appraisal arbitration",
        ),
        (
            "rates",
            "premium rate filing underwriting risk factor actuarial loss ratio discount surcharge",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let default_source_relevance: BTreeMap<String, f64> = [
        ("regulations", 0.3),
        ("forms", 0.25),
        ("claims", 0.25),
        ("rates", 0.2),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let chunk_overrides: BTreeMap<String, ChunkOverride> = [(
        "regulations".to_string(),
        ChunkOverride {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        },
    )]
    .into_iter()
    .collect();

    Ok(DomainProfile {
        name: NAME.to_string(),
        display_name: "Auto Insurance".to_string(),
        collection_name: "auto_insurance".to_string(),
        source_kinds: vec![
            "regulations".to_string(),
            "forms".to_string(),
            "claims".to_string(),
            "rates".to_string(),
        ],
        specialized_query_patterns: compile_patterns(NAME, SPECIALIZED_QUERY_PATTERNS)?,
        specialized_topic_patterns: compile_expansion_pairs(NAME, SPECIALIZED_TOPIC_PATTERNS)?,
        generic_specialized_expansion: GENERIC_SPECIALIZED_EXPANSION.to_string(),
        strip_noise_pattern: Some(compile_pattern(NAME, STRIP_NOISE)?),
        strip_filler_pattern: Some(compile_pattern(NAME, STRIP_FILLER)?),
        source_patterns: vec![
            ("regulations".to_string(), compile_patterns(NAME, REGULATIONS_PATTERNS)?),
            ("forms".to_string(), compile_patterns(NAME, FORMS_PATTERNS)?),
            ("claims".to_string(), compile_patterns(NAME, CLAIMS_PATTERNS)?),
            ("rates".to_string(), compile_patterns(NAME, RATES_PATTERNS)?),
        ],
        source_expansions,
        synonym_map: compile_expansion_pairs(NAME, SYNONYM_MAP)?,
        default_source_relevance,
        system_prompt: SYSTEM_PROMPT.to_string(),
        topics: resolve_topic_pack(NAME, config.topic_dir.as_deref(), TOPIC_PACK)?,
        specialized_source: Some("regulations".to_string()),
        specialized_k_floor: config.specialized_k,
        chunk_overrides,
        states: TOP_MARKETS.iter().map(|s| (*s).to_string()).collect(),
        quick_questions: QUICK_QUESTIONS.iter().map(|q| (*q).to_string()).collect(),
    })
}
