//! Column names of the raw source files and of the normalized output schema

use crate::error::Result;
use polars::prelude::DataFrame;

pub const REGION: &str = "regiao";
pub const STATE: &str = "estado";
pub const MUNICIPALITY: &str = "municipio";
pub const DATE: &str = "data";
pub const NEW_CASES: &str = "casosNovos";
pub const RECOVERED_NEW: &str = "Recuperadosnovos";
pub const IN_TREATMENT_NEW: &str = "emAcompanhamentoNovos";

/// Smoothed daily new cases, added by the cleaning stage
pub const SMOOTHED_NEW_CASES: &str = "novos_casos_novos";
/// Cumulative cases recomputed from the raw daily counts
pub const RECOUNTED_CUMULATIVE: &str = "novos_casos_acumulados";

pub const YEAR: &str = "ano";
pub const MONTH: &str = "mes";
pub const MONTH_NUMBER: &str = "mes_numerico";
pub const MONTH_LOCALIZED: &str = "mes_traduzido";
pub const WEEKDAY: &str = "dia_semana";
pub const WEEKDAY_LOCALIZED: &str = "dia_semana_traduzido";
pub const WEEKDAY_NUMBER: &str = "dia_semana_numerico";
pub const SEASON: &str = "estacao";

/// Raw columns parsed as nullable integers; every other raw column is text
pub const RAW_INTEGER_COLUMNS: [&str; 12] = [
    "coduf",
    "codmun",
    "codRegiaoSaude",
    "semanaEpi",
    "populacaoTCU2019",
    "casosAcumulado",
    NEW_CASES,
    "obitosAcumulado",
    "obitosNovos",
    RECOVERED_NEW,
    IN_TREATMENT_NEW,
    "interior/metropolitana",
];

/// Columns removed before the date features are added
pub const DROPPED_COLUMNS: [&str; 2] = [RECOVERED_NEW, IN_TREATMENT_NEW];

/// Source name to output name. Output names map to themselves so the
/// rename can run on an already normalized frame.
const COLUMN_NAMES: [(&str, &str); 30] = [
    (REGION, REGION),
    (STATE, STATE),
    (MUNICIPALITY, MUNICIPALITY),
    ("coduf", "coduf"),
    ("codmun", "codmun"),
    ("codRegiaoSaude", "cod_regiao_saude"),
    ("nomeRegiaoSaude", "nome_regiao_saude"),
    (DATE, DATE),
    ("semanaEpi", "semana_epi"),
    ("populacaoTCU2019", "populacao_tcu_2019"),
    ("casosAcumulado", "casos_acumulados"),
    (NEW_CASES, "casos_novos"),
    (SMOOTHED_NEW_CASES, SMOOTHED_NEW_CASES),
    ("obitosAcumulado", "obitos_acumulados"),
    ("obitosNovos", "obitos_novos"),
    (RECOVERED_NEW, "recuperados_novos"),
    (IN_TREATMENT_NEW, "em_acompanhamento_novos"),
    ("interior/metropolitana", "interior_metropolitana"),
    (RECOUNTED_CUMULATIVE, RECOUNTED_CUMULATIVE),
    ("cod_regiao_saude", "cod_regiao_saude"),
    ("nome_regiao_saude", "nome_regiao_saude"),
    ("semana_epi", "semana_epi"),
    ("populacao_tcu_2019", "populacao_tcu_2019"),
    ("casos_acumulados", "casos_acumulados"),
    ("casos_novos", "casos_novos"),
    ("obitos_acumulados", "obitos_acumulados"),
    ("obitos_novos", "obitos_novos"),
    ("recuperados_novos", "recuperados_novos"),
    ("em_acompanhamento_novos", "em_acompanhamento_novos"),
    ("interior_metropolitana", "interior_metropolitana"),
];

/// Output name for a column; names outside the mapping pass through
pub fn normalize_name(name: &str) -> &str {
    COLUMN_NAMES
        .iter()
        .find(|(source, _)| *source == name)
        .map(|(_, target)| *target)
        .unwrap_or(name)
}

/// Rename the frame's columns to the output schema, in place
pub fn normalize_columns(df: &mut DataFrame) -> Result<()> {
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .into_iter()
        .filter_map(|name| {
            let target = normalize_name(name);
            (target != name).then(|| (name.to_string(), target.to_string()))
        })
        .collect();

    for (source, target) in &renames {
        log::debug!("Renaming column {} -> {}", source, target);
        df.rename(source, target)?;
    }

    Ok(())
}
