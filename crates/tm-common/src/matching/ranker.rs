use serde::Serialize;
use tracing::debug;

use super::{
    checks::MatchCriterion,
    scoring::{MatchScore, score_match},
};
use crate::{
    ParentRequest, TutorProfile,
    store::{Store, StoreError},
};

/// 候補講師（TutorProfile + matchScore / matchDetails）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    #[serde(flatten)]
    pub tutor: TutorProfile,
    pub match_score: u8,
    pub match_details: Vec<MatchCriterion>,
    #[serde(skip)]
    pub explanation: String,
}

impl MatchCandidate {
    fn new(tutor: &TutorProfile, score: MatchScore) -> Self {
        Self {
            tutor: tutor.clone(),
            match_score: score.score,
            match_details: score.details.clone(),
            explanation: score.explain(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankerConfig {
    /// これ未満のスコアは除外（0 なら全件）
    pub min_score: u8,
    /// 返却する候補の最大数（None なら無制限）
    pub max_candidates: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionRanker {
    config: RankerConfig,
}

impl SuggestionRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    /// 未割当の講師だけを採点し、スコア降順に並べる（同点は入力順を維持）
    pub fn rank(&self, request: &ParentRequest, tutors: &[TutorProfile]) -> Vec<MatchCandidate> {
        let mut ranked: Vec<_> = tutors
            .iter()
            .filter(|tutor| !tutor.assigned)
            .map(|tutor| MatchCandidate::new(tutor, score_match(request, tutor)))
            .filter(|candidate| candidate.match_score >= self.config.min_score)
            .collect();

        // sort_by は安定ソート
        ranked.sort_by(|a, b| b.match_score.cmp(&a.match_score));

        if let Some(limit) = self.config.max_candidates {
            ranked.truncate(limit);
        }

        debug!(
            request_id = %request.id,
            pool = tutors.len(),
            candidates = ranked.len(),
            top_score = ranked.first().map(|c| c.match_score),
            "ranked tutor suggestions"
        );

        ranked
    }

    /// Store から依頼を引いて全講師をランキングする。依頼が無ければ None。
    pub fn suggest_for<S: Store + ?Sized>(
        &self,
        store: &S,
        request_id: &str,
    ) -> Result<Option<(ParentRequest, Vec<MatchCandidate>)>, StoreError> {
        let Some(request) = store.find_request(request_id)? else {
            return Ok(None);
        };

        let tutors = store.list_tutors()?;
        let ranked = self.rank(&request, &tutors);
        Ok(Some((request, ranked)))
    }
}

/// デフォルト設定でのランキング
pub fn rank_suggestions(request: &ParentRequest, tutors: &[TutorProfile]) -> Vec<MatchCandidate> {
    SuggestionRanker::default().rank(request, tutors)
}
