// src/search/themes.rs
//! Static vocabularies: per-theme tag sets, the synonym dictionary, SPD
//! organization ids, and human-readable theme labels.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::search::types::Theme;

/// Catalog tag a theme maps to when a single tag is needed.
pub fn primary_tag(theme: Theme) -> &'static str {
    match theme {
        Theme::Admin => "administration",
        Theme::Economy => "economie",
        Theme::Transport => "transports",
        Theme::Health => "sante",
        Theme::Environment => "environnement",
        Theme::Education => "education",
        Theme::Culture => "culture",
        Theme::Housing => "logement",
        Theme::Agriculture => "agriculture",
        Theme::Energy => "energie",
        Theme::Security => "securite",
        Theme::Social => "social",
        Theme::Tourism => "tourisme",
        Theme::Digital => "numerique",
        Theme::Any => "",
    }
}

/// Tag vocabulary a dataset must intersect to match a theme.
pub fn theme_tags(theme: Theme) -> &'static [&'static str] {
    match theme {
        Theme::Admin => &[
            "administration",
            "service-public",
            "collectivite",
            "mairie",
            "demarche",
        ],
        Theme::Economy => &[
            "economie",
            "entreprise",
            "emploi",
            "commerce",
            "industrie",
            "pib",
            "siret",
        ],
        Theme::Transport => &[
            "transport",
            "mobilite",
            "deplacement",
            "circulation",
            "velo",
            "bus",
            "train",
            "metro",
        ],
        Theme::Health => &[
            "sante",
            "hopital",
            "medecin",
            "medical",
            "soins",
            "etablissement-sante",
            "pharmacie",
        ],
        Theme::Environment => &[
            "environnement",
            "ecologie",
            "climat",
            "biodiversite",
            "pollution",
            "nature",
            "dechets",
        ],
        Theme::Education => &[
            "education",
            "enseignement",
            "scolaire",
            "ecole",
            "college",
            "lycee",
            "universite",
            "formation",
        ],
        Theme::Culture => &[
            "culture",
            "patrimoine",
            "musee",
            "bibliotheque",
            "theatre",
            "monument",
            "art",
        ],
        Theme::Housing => &[
            "logement",
            "habitat",
            "immobilier",
            "hlm",
            "construction",
            "urbanisme",
            "cadastre",
        ],
        Theme::Agriculture => &[
            "agriculture",
            "agricole",
            "exploitation",
            "elevage",
            "culture",
            "pac",
            "bio",
        ],
        Theme::Energy => &[
            "energie",
            "electricite",
            "gaz",
            "renouvelable",
            "consommation",
            "production",
            "eolien",
            "solaire",
        ],
        Theme::Security => &[
            "securite",
            "police",
            "gendarmerie",
            "delinquance",
            "accident",
            "pompier",
            "prevention",
        ],
        Theme::Social => &[
            "social",
            "aide-sociale",
            "insertion",
            "solidarite",
            "handicap",
            "personnes-agees",
            "famille",
        ],
        Theme::Tourism => &[
            "tourisme",
            "hotel",
            "camping",
            "visiteur",
            "attraction",
            "sejour",
            "vacances",
        ],
        Theme::Digital => &[
            "numerique",
            "digital",
            "internet",
            "fibre",
            "couverture",
            "open-data",
            "donnees",
        ],
        Theme::Any => &[],
    }
}

/// All themes with display labels, for interactive pickers.
pub fn theme_labels() -> &'static [(Theme, &'static str)] {
    &[
        (Theme::Admin, "Administration"),
        (Theme::Economy, "Économie"),
        (Theme::Transport, "Transports"),
        (Theme::Health, "Santé"),
        (Theme::Environment, "Environnement"),
        (Theme::Education, "Éducation"),
        (Theme::Culture, "Culture"),
        (Theme::Housing, "Logement"),
        (Theme::Agriculture, "Agriculture"),
        (Theme::Energy, "Énergie"),
        (Theme::Security, "Sécurité"),
        (Theme::Social, "Social"),
        (Theme::Tourism, "Tourisme"),
        (Theme::Digital, "Numérique"),
    ]
}

/// Synonym dictionary over normalized tokens.
///
/// Never applied to upstream catalog queries: the API ANDs all tokens, so
/// expansion would over-constrain. The local engine uses it corpus-side
/// only (a query token may be satisfied by one of its synonyms).
pub fn synonyms() -> &'static HashMap<&'static str, Vec<&'static str>> {
    static TABLE: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
        let mut table = HashMap::new();
        // Transport
        table.insert(
            "transport",
            vec!["mobilite", "deplacement", "circulation", "trafic"],
        );
        table.insert(
            "velo",
            vec!["cyclable", "piste-cyclable", "bicyclette", "velocipede"],
        );
        table.insert("bus", vec!["autobus", "transport-commun", "ligne-bus"]);
        table.insert(
            "train",
            vec!["sncf", "ferroviaire", "rail", "gare", "ter", "tgv"],
        );
        table.insert(
            "voiture",
            vec!["automobile", "vehicule", "parking", "stationnement"],
        );
        table.insert("metro", vec!["metropolitain", "rer", "tramway", "tram"]);
        // Environnement
        table.insert(
            "environnement",
            vec!["ecologie", "nature", "biodiversite", "climat"],
        );
        table.insert(
            "pollution",
            vec!["qualite-air", "emission", "co2", "particules"],
        );
        table.insert("dechets", vec!["ordures", "recyclage", "tri", "collecte"]);
        table.insert(
            "eau",
            vec!["assainissement", "potable", "cours-eau", "riviere"],
        );
        table.insert(
            "energie",
            vec!["electricite", "gaz", "renouvelable", "solaire", "eolien"],
        );
        // Santé
        table.insert("sante", vec!["medical", "hopital", "medecin", "soins"]);
        table.insert(
            "hopital",
            vec!["chu", "clinique", "urgences", "etablissement-sante"],
        );
        table.insert(
            "medecin",
            vec!["generaliste", "specialiste", "praticien", "docteur"],
        );
        table.insert("pharmacie", vec!["officine", "medicament"]);
        // Éducation
        table.insert("education", vec!["enseignement", "scolaire", "formation"]);
        table.insert(
            "ecole",
            vec!["primaire", "maternelle", "elementaire", "etablissement-scolaire"],
        );
        table.insert("college", vec!["secondaire", "collegien"]);
        table.insert("lycee", vec!["lyceen", "baccalaureat"]);
        table.insert(
            "universite",
            vec!["faculte", "etudiant", "superieur", "campus"],
        );
        // Économie
        table.insert(
            "economie",
            vec!["entreprise", "commerce", "emploi", "activite"],
        );
        table.insert(
            "emploi",
            vec!["travail", "chomage", "offre-emploi", "recrutement"],
        );
        table.insert(
            "entreprise",
            vec!["societe", "siret", "siren", "etablissement"],
        );
        table.insert("commerce", vec!["magasin", "boutique", "commercant"]);
        // Logement
        table.insert(
            "logement",
            vec!["habitat", "immobilier", "residence", "habitation"],
        );
        table.insert("hlm", vec!["social", "logement-social", "bailleur"]);
        // Administration
        table.insert("mairie", vec!["commune", "municipal", "hotel-ville"]);
        table.insert("prefecture", vec!["departement", "sous-prefecture"]);
        table.insert("region", vec!["conseil-regional", "collectivite"]);
        // Culture
        table.insert(
            "culture",
            vec!["musee", "bibliotheque", "theatre", "patrimoine"],
        );
        table.insert(
            "sport",
            vec!["equipement-sportif", "stade", "gymnase", "piscine"],
        );
        // Sécurité
        table.insert(
            "securite",
            vec!["police", "gendarmerie", "pompier", "secours"],
        );
        table.insert("accident", vec!["sinistre", "incident", "accidentologie"]);
        // Agriculture
        table.insert(
            "agriculture",
            vec!["agricole", "exploitation", "ferme", "elevage"],
        );
        table.insert("bio", vec!["biologique", "agriculture-biologique", "label"]);
        table
    });
    &TABLE
}

/// Organization ids holding the "Service Public de la Donnée" badge.
pub fn spd_organizations() -> &'static [&'static str] {
    &[
        "534fff75a3a7292c64a77de4",
        "534fff91a3a7292c64a77e5c",
        "534fff8ea3a7292c64a77e53",
        "534fff94a3a7292c64a77e7e",
        "534fff8ba3a7292c64a77e40",
        "534fff92a3a7292c64a77e6d",
        "5a83f81fc751df6f8573eb8a",
        "534fff81a3a7292c64a77df5",
        "534fff8aa3a7292c64a77e3a",
        "534fff94a3a7292c64a77e79",
        "534fffb5a3a7292c64a78009",
        "5abca8d588ee386ee6ece589",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_theme_has_a_vocabulary() {
        for (theme, _) in theme_labels() {
            assert!(!theme_tags(*theme).is_empty(), "{theme:?} has no tags");
            assert!(!primary_tag(*theme).is_empty());
        }
        assert!(theme_tags(Theme::Any).is_empty());
    }

    #[test]
    fn health_vocabulary_covers_pharmacies() {
        assert!(theme_tags(Theme::Health).contains(&"pharmacie"));
    }

    #[test]
    fn synonym_entries_are_normalized_tokens() {
        for (key, values) in synonyms() {
            let folded = crate::search::normalize::normalize(key);
            assert_eq!(&folded, key, "synonym key {key:?} is not normalized");
            for v in values {
                assert_eq!(&crate::search::normalize::normalize(v), v);
            }
        }
    }
}
