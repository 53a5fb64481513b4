//! Legacy country code tables
//!
//! Country cells store an index into these positionally significant tables.
//! Index 0 is the empty code, the sentinel for "unknown country". A few
//! historical aliases map onto their canonical entry before the positional
//! scan; the same aliases seed the verifier's equivalence table.

use crate::error::{GeoDbError, Result};

/// ISO-2 aliases resolved before the positional scan, also treated as
/// equivalent during verification
pub static ISO2_ALIASES: [(&str, &str); 1] = [("XK", "RS")];

/// ISO-3 aliases resolved before the positional scan, also treated as
/// equivalent during verification
pub static ISO3_ALIASES: [(&str, &str); 1] = [("RKS", "SRB")];

static COUNTRY_CODES_ISO2: [&str; 256] = [
    "", "AP", "EU", "AD", "AE", "AF", "AG", "AI", "AL", "AM",
    "CW", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AZ", "BA",
    "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BM", "BN",
    "BO", "BR", "BS", "BT", "BV", "BW", "BY", "BZ", "CA", "CC",
    "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN", "CO",
    "CR", "CU", "CV", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM",
    "DO", "DZ", "EC", "EE", "EG", "EH", "ER", "ES", "ET", "FI",
    "FJ", "FK", "FM", "FO", "FR", "SX", "GA", "GB", "GD", "GE",
    "GF", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS",
    "GT", "GU", "GW", "GY", "HK", "HM", "HN", "HR", "HT", "HU",
    "ID", "IE", "IL", "IN", "IO", "IQ", "IR", "IS", "IT", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR",
    "KW", "KY", "KZ", "LA", "LB", "LC", "LI", "LK", "LR", "LS",
    "LT", "LU", "LV", "LY", "MA", "MC", "MD", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU",
    "MV", "MW", "MX", "MY", "MZ", "NA", "NC", "NE", "NF", "NG",
    "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE",
    "PF", "PG", "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT",
    "PW", "PY", "QA", "RE", "RO", "RU", "RW", "SA", "SB", "SC",
    "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN",
    "SO", "SR", "ST", "SV", "SY", "SZ", "TC", "TD", "TF", "TG",
    "TH", "TJ", "TK", "TM", "TN", "TO", "TL", "TR", "TT", "TV",
    "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC",
    "VE", "VG", "VI", "VN", "VU", "WF", "WS", "YE", "YT", "RS",
    "ZA", "ZM", "ME", "ZW", "A1", "A2", "O1", "AX", "GG", "IM",
    "JE", "BL", "MF", "BQ", "SS", "O1",
];

static COUNTRY_CODES_ISO3: [&str; 256] = [
    "--", "AP", "EU", "AND", "ARE", "AFG", "ATG", "AIA",
    "ALB", "ARM", "CUW", "AGO", "ATA", "ARG", "ASM", "AUT",
    "AUS", "ABW", "AZE", "BIH", "BRB", "BGD", "BEL", "BFA",
    "BGR", "BHR", "BDI", "BEN", "BMU", "BRN", "BOL", "BRA",
    "BHS", "BTN", "BVT", "BWA", "BLR", "BLZ", "CAN", "CCK",
    "COD", "CAF", "COG", "CHE", "CIV", "COK", "CHL", "CMR",
    "CHN", "COL", "CRI", "CUB", "CPV", "CXR", "CYP", "CZE",
    "DEU", "DJI", "DNK", "DMA", "DOM", "DZA", "ECU", "EST",
    "EGY", "ESH", "ERI", "ESP", "ETH", "FIN", "FJI", "FLK",
    "FSM", "FRO", "FRA", "SXM", "GAB", "GBR", "GRD", "GEO",
    "GUF", "GHA", "GIB", "GRL", "GMB", "GIN", "GLP", "GNQ",
    "GRC", "SGS", "GTM", "GUM", "GNB", "GUY", "HKG", "HMD",
    "HND", "HRV", "HTI", "HUN", "IDN", "IRL", "ISR", "IND",
    "IOT", "IRQ", "IRN", "ISL", "ITA", "JAM", "JOR", "JPN",
    "KEN", "KGZ", "KHM", "KIR", "COM", "KNA", "PRK", "KOR",
    "KWT", "CYM", "KAZ", "LAO", "LBN", "LCA", "LIE", "LKA",
    "LBR", "LSO", "LTU", "LUX", "LVA", "LBY", "MAR", "MCO",
    "MDA", "MDG", "MHL", "MKD", "MLI", "MMR", "MNG", "MAC",
    "MNP", "MTQ", "MRT", "MSR", "MLT", "MUS", "MDV", "MWI",
    "MEX", "MYS", "MOZ", "NAM", "NCL", "NER", "NFK", "NGA",
    "NIC", "NLD", "NOR", "NPL", "NRU", "NIU", "NZL", "OMN",
    "PAN", "PER", "PYF", "PNG", "PHL", "PAK", "POL", "SPM",
    "PCN", "PRI", "PSE", "PRT", "PLW", "PRY", "QAT", "REU",
    "ROU", "RUS", "RWA", "SAU", "SLB", "SYC", "SDN", "SWE",
    "SGP", "SHN", "SVN", "SJM", "SVK", "SLE", "SMR", "SEN",
    "SOM", "SUR", "STP", "SLV", "SYR", "SWZ", "TCA", "TCD",
    "ATF", "TGO", "THA", "TJK", "TKL", "TKM", "TUN", "TON",
    "TLS", "TUR", "TTO", "TUV", "TWN", "TZA", "UKR", "UGA",
    "UMI", "USA", "URY", "UZB", "VAT", "VCT", "VEN", "VGB",
    "VIR", "VNM", "VUT", "WLF", "WSM", "YEM", "MYT", "SRB",
    "ZAF", "ZMB", "MNE", "ZWE", "A1", "A2", "O1", "ALA",
    "GGY", "IMN", "JEY", "BLM", "MAF", "BES", "SSD", "O1",
];

fn code_index(codes: &[&str], aliases: &[(&str, &str)], country_code: &str) -> Result<usize> {
    let mut country_code = country_code.to_uppercase();

    if let Some((_, mapped)) = aliases.iter().find(|(alias, _)| *alias == country_code) {
        country_code = mapped.to_string();
    }

    codes
        .iter()
        .position(|code| *code == country_code)
        .ok_or(GeoDbError::CountryNotFound)
}

/// Index of a 2-character country code; the empty code is index 0
pub fn iso2_index(country_code: &str) -> Result<usize> {
    if country_code.is_empty() {
        return Ok(0);
    }

    if country_code.len() != 2 {
        return Err(GeoDbError::CountryNotFound);
    }

    code_index(&COUNTRY_CODES_ISO2, &ISO2_ALIASES, country_code)
}

/// Index of a 3-character (or legacy 2-character) country code
pub fn iso3_index(country_code: &str) -> Result<usize> {
    if country_code.is_empty() {
        return Ok(0);
    }

    if country_code.len() < 2 || country_code.len() > 3 {
        return Err(GeoDbError::CountryNotFound);
    }

    code_index(&COUNTRY_CODES_ISO3, &ISO3_ALIASES, country_code)
}

/// The 2-character country code stored at the given index
pub fn iso2_code(index: usize) -> Result<&'static str> {
    COUNTRY_CODES_ISO2
        .get(index)
        .copied()
        .ok_or(GeoDbError::CountryNotFound)
}

/// The 3-character country code stored at the given index
pub fn iso3_code(index: usize) -> Result<&'static str> {
    COUNTRY_CODES_ISO3
        .get(index)
        .copied()
        .ok_or(GeoDbError::CountryNotFound)
}
