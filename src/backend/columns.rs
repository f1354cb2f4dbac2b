use serde::Serialize;

/// Semantic columns an import table can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Unit,
    Article,
    Title,
    Text,
    Translation,
    TranslationEn,
    TranslationVi,
    TranslationMn,
    AudioUrl,
}

impl Field {
    pub fn all() -> &'static [Field] {
        &[
            Field::Unit,
            Field::Article,
            Field::Title,
            Field::Text,
            Field::Translation,
            Field::TranslationEn,
            Field::TranslationVi,
            Field::TranslationMn,
            Field::AudioUrl,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Unit => "unit",
            Field::Article => "article",
            Field::Title => "title",
            Field::Text => "text",
            Field::Translation => "translation",
            Field::TranslationEn => "translationEn",
            Field::TranslationVi => "translationVi",
            Field::TranslationMn => "translationMn",
            Field::AudioUrl => "audioUrl",
        }
    }

    /// Lowercase substrings that identify this field's header, tried in order.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Field::Unit => &["单元", "unit", "课"],
            Field::Article => &["文章", "篇", "序号", "article"],
            Field::Title => &["标题", "题目", "title"],
            Field::Text => &["正文", "内容", "text", "reading", "阅读", "content"],
            Field::Translation => &["翻译", "译文", "中文", "translation"],
            Field::TranslationEn => {
                &["英文", "english", "translationen", "translation_en", "trans_en"]
            }
            Field::TranslationVi => {
                &["越南", "vietnamese", "translationvi", "translation_vi", "trans_vi"]
            }
            Field::TranslationMn => {
                &["蒙古", "mongolian", "translationmn", "translation_mn", "trans_mn"]
            }
            Field::AudioUrl => &["音频", "audio", "mp3"],
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Field::Unit | Field::Title | Field::Text)
    }
}

/// Header position of each semantic field, `None` when no header matched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMap {
    pub unit: Option<usize>,
    pub article: Option<usize>,
    pub title: Option<usize>,
    pub text: Option<usize>,
    pub translation: Option<usize>,
    pub translation_en: Option<usize>,
    pub translation_vi: Option<usize>,
    pub translation_mn: Option<usize>,
    pub audio_url: Option<usize>,
}

impl ColumnMap {
    /// Resolve every field against a header row.
    ///
    /// Fields are matched independently, so an ambiguous header can land two
    /// fields on the same column.
    pub fn from_header(header: &[String]) -> Self {
        let lowered: Vec<String> = header.iter().map(|h| h.to_lowercase()).collect();

        let mut map = ColumnMap::default();
        for &field in Field::all() {
            let index = lowered
                .iter()
                .position(|cell| field.keywords().iter().any(|kw| cell.contains(kw)));
            map.set(field, index);
        }

        tracing::debug!(?map, "resolved header columns");
        map
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Unit => self.unit,
            Field::Article => self.article,
            Field::Title => self.title,
            Field::Text => self.text,
            Field::Translation => self.translation,
            Field::TranslationEn => self.translation_en,
            Field::TranslationVi => self.translation_vi,
            Field::TranslationMn => self.translation_mn,
            Field::AudioUrl => self.audio_url,
        }
    }

    fn set(&mut self, field: Field, index: Option<usize>) {
        let slot = match field {
            Field::Unit => &mut self.unit,
            Field::Article => &mut self.article,
            Field::Title => &mut self.title,
            Field::Text => &mut self.text,
            Field::Translation => &mut self.translation,
            Field::TranslationEn => &mut self.translation_en,
            Field::TranslationVi => &mut self.translation_vi,
            Field::TranslationMn => &mut self.translation_mn,
            Field::AudioUrl => &mut self.audio_url,
        };
        *slot = index;
    }

    /// Required fields (unit, title, text) that no header matched.
    pub fn missing_required(&self) -> Vec<Field> {
        Field::all()
            .iter()
            .copied()
            .filter(|f| f.is_required() && self.get(*f).is_none())
            .collect()
    }
}
