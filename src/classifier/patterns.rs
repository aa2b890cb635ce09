//! Normative pattern lists, one set per attack category.
//!
//! Expressions are compiled case-insensitive with multi-line matching.
//! Within a category the first match wins; categories are checked
//! independently so one payload can hit any subset.

pub const SQL_INJECTION: &[&str] = &[
    r"\bselect\b.+\bfrom\b",
    r"\bunion\b.+\bselect\b",
    r"'\s*or\s*'?\d+'?\s*=\s*'?\d+",
    r"'\s*or\s+'[^']*'\s*=\s*'",
    r"(\d|')\s*--",
    r"/\*.*\*/",
    r"\bsleep\s*\(\s*\d+\s*\)",
    r"\bbenchmark\s*\(",
    r"\bwaitfor\s+delay\b",
    r"\binformation_schema\b",
    r"\bxp_cmdshell\b",
    r"\bdrop\s+table\b",
    r"\binsert\s+into\b.+\bvalues\b",
    r"\bload_file\s*\(",
];

pub const COMMAND_INJECTION: &[&str] = &[
    r";\s*(cat|ls|id|whoami|uname|pwd|wget|curl|nc|ncat|bash|sh|python)\b",
    r"\|\s*(cat|ls|id|whoami|uname|nc|ncat|bash|sh)\b",
    r"&&\s*(cat|ls|id|whoami|wget|curl|chmod)\b",
    r"\$\([^)]+\)",
    r"\$\{[^}]+\}",
    r"`[^`]+`",
    r"/bin/(ba|da|a|z|k)?sh\b",
    r"\brm\s+-rf\b",
    r"\bchmod\s+\+x\b",
    r"\bnc\s+(-\w+\s+)*-e\b",
    r"\bmkfifo\b.*\bnc\b",
    r"/dev/tcp/",
];

pub const XSS: &[&str] = &[
    r"<script[\s>]",
    r"</script\s*>",
    r"javascript\s*:",
    r"vbscript\s*:",
    r"\bon(load|error|click|mouseover|mouseenter|focus|submit|pointerover)\s*=",
    r"<iframe[\s>]",
    r"<svg[^>]*\bon\w+\s*=",
    r"document\.cookie",
    r"document\.location",
    r"\balert\s*\(",
    r"<img[^>]+\bonerror\b",
];

pub const PATH_TRAVERSAL: &[&str] = &[
    r"(\.\./){2,}",
    r"(\.\.\\){2,}",
    r"(%2e%2e(%2f|/)){2,}",
    r"\.\.%2f",
    r"\.\.%5c",
    r"/etc/(passwd|shadow|hosts|issue|group)",
    r"/proc/(self|\d+)/",
    r"/root/(\.ssh|\.bash_history|\.profile)",
    r"c:\\windows\\",
    r"c:/windows/",
    r"\bboot\.ini\b",
];

pub const PROMPT_INJECTION: &[&str] = &[
    r"ignore\s+(all\s+)?(previous|above|prior)\s+instructions",
    r"disregard\s+(all\s+)?(previous|prior)\s+(instructions|prompts)",
    r"you\s+are\s+now\s+",
    r"pretend\s+(you\s+are|to\s+be)\b",
    r"\bjailbreak\b",
    r"\bdan\s+mode\b",
    r"\[system\]",
    r"<\|?system\|?>",
    r"bypass\s+(your\s+)?(safety|filters|guardrails)",
    r"reveal\s+(your\s+)?(system\s+prompt|instructions)",
    r"\bdeveloper\s+mode\b",
    r"repeat\s+the\s+text\s+above",
];

pub const SCAN: &[&str] = &[
    r"\b(nmap|sqlmap|nikto|gobuster|dirbuster|dirb|masscan|wfuzz|feroxbuster|hydra|metasploit|nuclei|zgrab|burpsuite)\b",
    r"\.git(/|\b)",
    r"\.env\b",
    r"/wp-(admin|login|content|includes)",
    r"/phpmyadmin",
    r"\bswagger\b",
    r"/actuator(/|\b)",
    r"/cgi-bin/",
    r"\.htaccess\b",
    r"/server-status\b",
    r"\.aws/credentials",
    r"/id_rsa\b",
];

pub const EXPLOIT: &[&str] = &[
    r"\bcve-\d{4}-\d{4,}\b",
    r"jndi:(ldap|rmi|dns)",
    r"\$\{jndi",
    r"\blog4shell\b",
    r"gopher://",
    r"dict://",
    r"file://",
    r"eval\s*\(\s*base64",
    r"\bbase64_decode\s*\(",
    r"\(\)\s*\{\s*:;\s*\}\s*;",
    r"eval-stdin\.php",
    r"\bstruts2?\b.*\bognl\b",
];

/// (category index stability) The order here fixes the order categories are
/// reported in, matching [`crate::classifier::types::AttackCategory::ALL`].
pub fn all_sets() -> [(&'static [&'static str], crate::classifier::types::AttackCategory); 7] {
    use crate::classifier::types::AttackCategory;
    [
        (SQL_INJECTION, AttackCategory::SqlInjection),
        (COMMAND_INJECTION, AttackCategory::CommandInjection),
        (XSS, AttackCategory::Xss),
        (PATH_TRAVERSAL, AttackCategory::PathTraversal),
        (PROMPT_INJECTION, AttackCategory::PromptInjection),
        (SCAN, AttackCategory::Scan),
        (EXPLOIT, AttackCategory::Exploit),
    ]
}
