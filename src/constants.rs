// Document-library roots to walk on every run.
pub const ROOT_DIRS: &[&str] = &[
    "https://cdre.ons.org.br/CDRE%20%20Processo%20Relatrio%20Dirio%20da%20Situao%20HidrulicoH/Forms/AllItems.aspx",
    "https://cdre.ons.org.br/CDRE%20%20Processo%20ACOMPH%20%20Acompanhamento%20Hidrolgico/Forms/AllItems.aspx",
];

// Month-keyed directory base watched for changes.
pub const URL_TO_WATCH: &str = "https://agentes.ons.org.br/publicacao/PrevisaoVazoes/preliminar/";

// Files that must never be relocated out of the download folder.
pub const APPLICATION_FILES: &[&str] = &[
    "__init__",
    "web-dirs",
    "notification.html",
    "settings.json",
];

// The first entry is the one actually sent; the list exists so swapping is a one-line change.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/62.0.3202.94 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:57.0) Gecko/20100101 Firefox/57.0",
];

// Localized month names used in the watched directory's path segments.
pub const MONTHS: &[&str] = &[
    "JANEIRO", "FEVEREIRO", "MARCO", "ABRIL", "MAIO", "JUNHO", "JULHO", "AGOSTO", "SETEMBRO",
    "OUTUBRO", "NOVEMBRO", "DEZEMBRO",
];

// Extensions the traversal treats as downloadable files. Lowercase suffix match only.
pub const ALLOWED_EXTENSIONS: &[&str] = &["zip", "xls", "xlsx", "rar"];

// Selectors addressing the document-library listing view.
pub const LISTING_ROW_SELECTOR: &str = "#onetidDoclibViewTbl0 > tbody > tr";
pub const ROW_LINK_SELECTOR: &str = "td:nth-child(3) a";
pub const NEXT_PAGE_SELECTOR: &str = "#pagingWPQ2next > a";

// Login form locators.
pub const LOGIN_USERNAME_ID: &str = "username";
pub const LOGIN_PASSWORD_ID: &str = "password";
pub const LOGIN_SUBMIT_NAME: &str = "submit.Signin";

// Instance-path filenames.
pub const SETTINGS_FILE: &str = "settings.json";
pub const SETTINGS_TEMPLATE_FILE: &str = "settings.json.example";
pub const SNAPSHOT_FILE: &str = "web-dirs";
pub const NOTIFICATION_TEMPLATE: &str = "notification.html";
