//! Shared fixtures for unit and pipeline tests.

use crate::constants::RAIS_2020_COLUMN_COUNT;
use crate::header::sanitize_header;
use polars::prelude::*;

/// Header line of the RAIS 2020 vínculos files, decoded to UTF-8
pub const RAIS_2020_HEADER: [&str; RAIS_2020_COLUMN_COUNT] = [
    "Bairros SP",
    "Bairros Fortaleza",
    "Bairros RJ",
    "Causa Afastamento 1",
    "Causa Afastamento 2",
    "Causa Afastamento 3",
    "Motivo Desligamento",
    "CBO Ocupação 2002",
    "CNAE 2.0 Classe",
    "CNAE 95 Classe",
    "Distritos SP",
    "Vínculo Ativo 31/12",
    "Faixa Etária",
    "Faixa Hora Contrat",
    "Faixa Remun Dezem (SM)",
    "Faixa Remun Média (SM)",
    "Faixa Tempo Emprego",
    "Escolaridade após 2005",
    "Qtd Hora Contr",
    "Idade",
    "Ind CEI Vinculado",
    "Ind Simples",
    "Mês Admissão",
    "Mês Desligamento",
    "Mun Trab",
    "Município",
    "Nacionalidade",
    "Natureza Jurídica",
    "Ind Portador Defic",
    "Qtd Dias Afastamento",
    "Raça Cor",
    "Regiões Adm DF",
    "Vl Remun Dezembro Nom",
    "Vl Remun Dezembro (SM)",
    "Vl Remun Média Nom",
    "Vl Remun Média (SM)",
    "CNAE 2.0 Subclasse",
    "Sexo Trabalhador",
    "Tamanho Estabelecimento",
    "Tempo Emprego",
    "Tipo Admissão",
    "Tipo Estab",
    "Tipo Estab",
    "Tipo Defic",
    "Tipo Vínculo",
    "IBGE Subsetor",
    "Vl Rem Janeiro SC",
    "Vl Rem Fevereiro SC",
    "Vl Rem Março SC",
    "Vl Rem Abril SC",
    "Vl Rem Maio SC",
    "Vl Rem Junho SC",
    "Vl Rem Julho SC",
    "Vl Rem Agosto SC",
    "Vl Rem Setembro SC",
    "Vl Rem Outubro SC",
    "Vl Rem Novembro SC",
    "Ano Chegada Brasil",
    "Ind Trab Intermitente",
    "Ind Trab Parcial",
];

/// Sanitized RAIS header, optionally with some cells replaced before sanitizing
pub fn raw_header_with(replacements: &[(usize, &str)]) -> Vec<String> {
    let mut cells: Vec<&str> = RAIS_2020_HEADER.to_vec();
    for (index, value) in replacements {
        cells[*index] = *value;
    }
    sanitize_header(&cells)
}

/// One-row frame over the sanitized header, every value a string.
/// Columns default to "1"; overrides are keyed by sanitized name.
pub fn raw_frame_with(header: &[String], overrides: &[(&str, Option<&str>)]) -> DataFrame {
    let columns: Vec<Column> = header
        .iter()
        .map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name.as_str())
                .map(|(_, value)| *value)
                .unwrap_or(Some("1"));
            Column::new(name.as_str().into(), [value])
        })
        .collect();
    DataFrame::new(columns).unwrap()
}

pub fn raw_frame(overrides: &[(&str, Option<&str>)]) -> DataFrame {
    raw_frame_with(&raw_header_with(&[]), overrides)
}

/// Semicolon-separated RAIS file body; `rows` are full 60-value rows
pub fn rais_file_contents(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut contents = header.join(";");
    contents.push_str("\r\n");
    for row in rows {
        contents.push_str(&row.join(";"));
        contents.push_str("\r\n");
    }
    contents
}

/// A full row of "1" values with selected positions replaced
pub fn rais_row(overrides: &[(usize, &str)]) -> Vec<String> {
    let mut row: Vec<String> = vec!["1".to_string(); RAIS_2020_HEADER.len()];
    for (index, value) in overrides {
        row[*index] = value.to_string();
    }
    row
}
