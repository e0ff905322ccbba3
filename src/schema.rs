//! Static normalization tables and column mapping resolution.
//!
//! Holds the RAIS 2020 raw → canonical rename table and the numeric cast
//! table, validates them at construction and resolves the rename table
//! against the concrete column list of an input frame.

use crate::error::{RaisError, Result};
use crate::models::{CastRule, ColumnKey, RenameRule};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Raw → canonical rename table for the RAIS 2020 vínculos layout.
///
/// Accented headers are addressed by position because their legacy
/// encoding does not survive reliably; `Tipo Estab41`/`Tipo Estab42` are
/// the sanitized names of the duplicated `Tipo Estab` header.
pub const RAIS_2020_RENAMES: &[RenameRule] = &[
    RenameRule::header("Bairros SP", "bairros_sp"),
    RenameRule::header("Bairros Fortaleza", "bairros_fortaleza"),
    RenameRule::header("Bairros RJ", "bairros_rj"),
    RenameRule::header("Causa Afastamento 1", "causa_afastamento_1"),
    RenameRule::header("Causa Afastamento 2", "causa_afastamento_2"),
    RenameRule::header("Causa Afastamento 3", "causa_afastamento_3"),
    RenameRule::header("Motivo Desligamento", "motivo_desligamento"),
    RenameRule::position(7, "cbo_ocupacao_2002"),
    RenameRule::header("CNAE 2.0 Classe", "cnae_2_0_classe"),
    RenameRule::header("CNAE 95 Classe", "cnae_95_classe"),
    RenameRule::header("Distritos SP", "distritos_sp"),
    RenameRule::position(11, "vinculo_ativo_31_12"),
    RenameRule::position(12, "faixa_etaria"),
    RenameRule::header("Faixa Hora Contrat", "faixa_hora_contrat"),
    RenameRule::header("Faixa Remun Dezem (SM)", "faixa_remun_dezem_sm"),
    RenameRule::position(15, "faixa_remun_media_sm"),
    RenameRule::header("Faixa Tempo Emprego", "faixa_tempo_emprego"),
    RenameRule::position(17, "escolaridade_apos_2005"),
    RenameRule::header("Qtd Hora Contr", "qtd_hora_contr"),
    RenameRule::header("Idade", "idade"),
    RenameRule::header("Ind CEI Vinculado", "ind_cei_vinculado"),
    RenameRule::header("Ind Simples", "ind_simples"),
    RenameRule::position(22, "mes_admissao"),
    RenameRule::position(23, "mes_desligamento"),
    RenameRule::header("Mun Trab", "mun_trab"),
    RenameRule::position(25, "municipio"),
    RenameRule::header("Nacionalidade", "nacionalidade"),
    RenameRule::position(27, "natureza_juridica"),
    RenameRule::header("Ind Portador Defic", "ind_portador_defic"),
    RenameRule::header("Qtd Dias Afastamento", "qtd_dias_afastamento"),
    RenameRule::position(30, "raca_cor"),
    RenameRule::position(31, "regioes_adm_df"),
    RenameRule::header("Vl Remun Dezembro Nom", "vl_remun_dezembro_nom"),
    RenameRule::header("Vl Remun Dezembro (SM)", "vl_remun_dezembro_sm"),
    RenameRule::position(34, "vl_remun_media_nom"),
    RenameRule::position(35, "vl_remun_media_sm"),
    RenameRule::header("CNAE 2.0 Subclasse", "cnae_2_0_subclasse"),
    RenameRule::header("Sexo Trabalhador", "sexo_trabalhador"),
    RenameRule::header("Tamanho Estabelecimento", "tamanho_estabelecimento"),
    RenameRule::header("Tempo Emprego", "tempo_emprego"),
    RenameRule::position(40, "tipo_admissao"),
    RenameRule::header("Tipo Estab41", "tipo_estab41"),
    RenameRule::header("Tipo Estab42", "tipo_estab42"),
    RenameRule::header("Tipo Defic", "tipo_defic"),
    RenameRule::position(44, "tipo_vinculo"),
    RenameRule::header("IBGE Subsetor", "ibge_subsetor"),
    RenameRule::header("Vl Rem Janeiro SC", "vl_rem_janeiro_sc"),
    RenameRule::header("Vl Rem Fevereiro SC", "vl_rem_fevereiro_sc"),
    RenameRule::position(48, "vl_rem_marco_sc"),
    RenameRule::header("Vl Rem Abril SC", "vl_rem_abril_sc"),
    RenameRule::header("Vl Rem Maio SC", "vl_rem_maio_sc"),
    RenameRule::header("Vl Rem Junho SC", "vl_rem_junho_sc"),
    RenameRule::header("Vl Rem Julho SC", "vl_rem_julho_sc"),
    RenameRule::header("Vl Rem Agosto SC", "vl_rem_agosto_sc"),
    RenameRule::header("Vl Rem Setembro SC", "vl_rem_setembro_sc"),
    RenameRule::header("Vl Rem Outubro SC", "vl_rem_outubro_sc"),
    RenameRule::header("Vl Rem Novembro SC", "vl_rem_novembro_sc"),
    RenameRule::header("Ano Chegada Brasil", "ano_chegada_brasil"),
    RenameRule::header("Ind Trab Intermitente", "ind_trab_intermitente"),
    RenameRule::header("Ind Trab Parcial", "ind_trab_parcial"),
];

/// Numeric coercions applied after renaming.
///
/// `mes_desligamento` is an integer month while the monetary columns carry
/// a decimal comma; the two treatments are kept distinct on purpose.
pub const RAIS_2020_CASTS: &[CastRule] = &[
    CastRule::int("mes_desligamento"),
    CastRule::decimal_comma("vl_remun_dezembro_nom"),
    CastRule::decimal_comma("vl_remun_dezembro_sm"),
    CastRule::decimal_comma("vl_remun_media_nom"),
    CastRule::decimal_comma("vl_remun_media_sm"),
    CastRule::decimal_comma("vl_rem_janeiro_sc"),
    CastRule::decimal_comma("vl_rem_fevereiro_sc"),
    CastRule::decimal_comma("vl_rem_marco_sc"),
    CastRule::decimal_comma("vl_rem_abril_sc"),
    CastRule::decimal_comma("vl_rem_maio_sc"),
    CastRule::decimal_comma("vl_rem_junho_sc"),
    CastRule::decimal_comma("vl_rem_julho_sc"),
    CastRule::decimal_comma("vl_rem_agosto_sc"),
    CastRule::decimal_comma("vl_rem_setembro_sc"),
    CastRule::decimal_comma("vl_rem_outubro_sc"),
    CastRule::decimal_comma("vl_rem_novembro_sc"),
];

/// Validated rename table
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    rules: Vec<RenameRule>,
    canonical: HashSet<&'static str>,
    max_position: Option<usize>,
}

impl ColumnMapping {
    /// Build a mapping, rejecting duplicate canonical names, headers or positions
    pub fn new(rules: &[RenameRule]) -> Result<Self> {
        let mut canonical = HashSet::new();
        let mut keys = HashSet::new();

        for rule in rules {
            if rule.canonical.is_empty() {
                return Err(RaisError::InvalidMapping {
                    reason: format!("{} maps to an empty canonical name", rule.key),
                });
            }
            if !canonical.insert(rule.canonical) {
                return Err(RaisError::InvalidMapping {
                    reason: format!("canonical name '{}' is used twice", rule.canonical),
                });
            }
            if !keys.insert(rule.key) {
                return Err(RaisError::InvalidMapping {
                    reason: format!("{} is mapped twice", rule.key),
                });
            }
        }

        let max_position = rules
            .iter()
            .filter_map(|rule| match rule.key {
                ColumnKey::Position(index) => Some(index),
                ColumnKey::Header(_) => None,
            })
            .max();

        Ok(Self {
            rules: rules.to_vec(),
            canonical,
            max_position,
        })
    }

    /// The RAIS 2020 vínculos mapping
    pub fn rais_2020() -> Result<Self> {
        Self::new(RAIS_2020_RENAMES)
    }

    pub fn rules(&self) -> &[RenameRule] {
        &self.rules
    }

    /// Highest position referenced by a positional rule
    pub fn max_position(&self) -> Option<usize> {
        self.max_position
    }

    pub fn is_canonical(&self, name: &str) -> bool {
        self.canonical.contains(name)
    }

    /// Canonical names in table order
    pub fn canonical_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.canonical)
    }

    /// Resolve the table against the columns of an input frame.
    ///
    /// Positional rules are bound to whatever column sits at that index;
    /// header rules only apply when the header is present.
    pub fn resolve(&self, columns: &[String]) -> Result<RenamePlan> {
        if let Some(position) = self.max_position {
            if position >= columns.len() {
                return Err(RaisError::PositionOutOfBounds {
                    position,
                    column_count: columns.len(),
                });
            }
        }

        let index_of: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect();

        let mut targets: Vec<Option<&RenameRule>> = vec![None; columns.len()];
        for rule in &self.rules {
            let index = match rule.key {
                ColumnKey::Position(index) => Some(index),
                ColumnKey::Header(raw) => index_of.get(raw).copied(),
            };
            let Some(index) = index else {
                continue;
            };

            if let Some(previous) = targets[index] {
                return Err(RaisError::AmbiguousColumn {
                    column: columns[index].clone(),
                    first: previous.canonical.to_string(),
                    second: rule.canonical.to_string(),
                });
            }
            targets[index] = Some(rule);
        }

        let mut seen = HashSet::new();
        let mut pairs = Vec::with_capacity(columns.len());
        let mut unmapped = Vec::new();
        for (source, target) in columns.iter().zip(targets) {
            let output = match target {
                Some(rule) => rule.canonical.to_string(),
                None => {
                    if !self.is_canonical(source) {
                        unmapped.push(source.clone());
                    }
                    source.clone()
                }
            };
            if !seen.insert(output.clone()) {
                return Err(RaisError::DuplicateColumn { column: output });
            }
            pairs.push((source.clone(), output));
        }

        debug!(
            "Resolved rename plan: {} of {} columns renamed, {} unmapped",
            pairs.iter().filter(|(from, to)| from != to).count(),
            pairs.len(),
            unmapped.len()
        );

        Ok(RenamePlan { pairs, unmapped })
    }
}

/// Concrete rename for one input layout, one entry per column in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pairs: Vec<(String, String)>,
    unmapped: Vec<String>,
}

impl RenamePlan {
    /// Plan that keeps every column under its current name
    pub fn identity(columns: &[String]) -> Self {
        Self {
            pairs: columns
                .iter()
                .map(|name| (name.clone(), name.clone()))
                .collect(),
            unmapped: Vec::new(),
        }
    }

    /// `(source, output)` name pairs in column order
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, output)| output.as_str())
    }

    /// Columns no rule matched and that are not canonical already
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }

    pub fn is_identity(&self) -> bool {
        self.pairs.iter().all(|(from, to)| from == to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RAIS_2020_COLUMN_COUNT;
    use crate::models::CastTarget;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rais_mapping_covers_full_layout() {
        let mapping = ColumnMapping::rais_2020().unwrap();

        assert_eq!(mapping.rules().len(), RAIS_2020_COLUMN_COUNT);
        assert_eq!(mapping.max_position(), Some(48));
        assert!(mapping.is_canonical("municipio"));
        assert!(mapping.is_canonical("vinculo_ativo_31_12"));
        assert!(!mapping.is_canonical("Idade"));
    }

    #[test]
    fn test_cast_rules_reference_canonical_names() {
        let mapping = ColumnMapping::rais_2020().unwrap();

        for rule in RAIS_2020_CASTS {
            assert!(mapping.is_canonical(rule.column), "{}", rule.column);
        }
        let ints: Vec<_> = RAIS_2020_CASTS
            .iter()
            .filter(|rule| rule.target == CastTarget::Int)
            .map(|rule| rule.column)
            .collect();
        assert_eq!(ints, vec!["mes_desligamento"]);
    }

    #[test]
    fn test_duplicate_canonical_name_rejected() {
        let rules = [
            RenameRule::header("Idade", "idade"),
            RenameRule::position(3, "idade"),
        ];
        let err = ColumnMapping::new(&rules).unwrap_err();
        assert!(matches!(err, RaisError::InvalidMapping { .. }));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let rules = [
            RenameRule::position(1, "a"),
            RenameRule::position(1, "b"),
        ];
        assert!(ColumnMapping::new(&rules).is_err());
    }

    #[test]
    fn test_resolve_mixes_headers_and_positions() {
        let rules = [
            RenameRule::header("Idade", "idade"),
            RenameRule::position(1, "municipio"),
        ];
        let mapping = ColumnMapping::new(&rules).unwrap();

        let plan = mapping
            .resolve(&columns(&["Idade", "MunicÃ­pio", "Extra"]))
            .unwrap();

        let outputs: Vec<_> = plan.output_names().collect();
        assert_eq!(outputs, vec!["idade", "municipio", "Extra"]);
        assert_eq!(plan.unmapped(), &["Extra".to_string()]);
        assert!(!plan.is_identity());
    }

    #[test]
    fn test_missing_header_rule_is_skipped() {
        let rules = [RenameRule::header("Bairros SP", "bairros_sp")];
        let mapping = ColumnMapping::new(&rules).unwrap();

        let plan = mapping.resolve(&columns(&["Idade"])).unwrap();
        assert!(plan.is_identity());
    }

    #[test]
    fn test_position_out_of_bounds_is_schema_drift() {
        let mapping = ColumnMapping::rais_2020().unwrap();

        let err = mapping.resolve(&columns(&["a", "b", "c"])).unwrap_err();
        assert!(err.is_schema_drift());
        match err {
            RaisError::PositionOutOfBounds {
                position,
                column_count,
            } => {
                assert_eq!(position, 48);
                assert_eq!(column_count, 3);
            }
            other => panic!("Expected PositionOutOfBounds, got {other:?}"),
        }
    }

    #[test]
    fn test_header_and_position_on_same_column_is_ambiguous() {
        let rules = [
            RenameRule::header("Idade", "idade"),
            RenameRule::position(0, "faixa_etaria"),
        ];
        let mapping = ColumnMapping::new(&rules).unwrap();

        let err = mapping.resolve(&columns(&["Idade", "x"])).unwrap_err();
        assert!(matches!(err, RaisError::AmbiguousColumn { .. }));
    }

    #[test]
    fn test_rename_onto_existing_name_is_duplicate() {
        let rules = [RenameRule::position(0, "idade")];
        let mapping = ColumnMapping::new(&rules).unwrap();

        let err = mapping.resolve(&columns(&["Age", "idade"])).unwrap_err();
        assert!(matches!(err, RaisError::DuplicateColumn { column } if column == "idade"));
    }
}
