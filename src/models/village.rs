use serde::{Deserialize, Serialize};

/// Village identity used on letterheads (singleton, id=1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillageInfo {
    pub id: i64,
    pub name: String,
    pub district: String,
    pub regency: String,
    pub province: String,
    pub address: String,
    pub postal_code: String,
    pub leader_name: String,
    pub leader_title: String,
    pub phone: String,
    pub email: String,
    pub logo_path: Option<String>,
    pub signature_path: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Default for VillageInfo {
    fn default() -> Self {
        Self {
            id: 1,
            name: String::new(),
            district: String::new(),
            regency: String::new(),
            province: String::new(),
            address: String::new(),
            postal_code: String::new(),
            leader_name: String::new(),
            leader_title: "Kepala Desa".to_string(),
            phone: String::new(),
            email: String::new(),
            logo_path: None,
            signature_path: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl VillageInfo {
    /// Letterhead lines, top to bottom
    pub fn letterhead_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.regency.is_empty() {
            lines.push(format!("PEMERINTAH KABUPATEN {}", self.regency.to_uppercase()));
        }
        if !self.district.is_empty() {
            lines.push(format!("KECAMATAN {}", self.district.to_uppercase()));
        }
        lines.push(format!("DESA {}", self.name.to_uppercase()));
        lines
    }

    /// Address line with contact details
    pub fn contact_line(&self) -> String {
        let mut parts = Vec::new();
        if !self.address.is_empty() {
            parts.push(self.address.clone());
        }
        if !self.postal_code.is_empty() {
            parts.push(format!("Kode Pos {}", self.postal_code));
        }
        if !self.phone.is_empty() {
            parts.push(format!("Telp. {}", self.phone));
        }
        if !self.email.is_empty() {
            parts.push(format!("Email: {}", self.email));
        }
        parts.join(", ")
    }

    pub fn is_configured(&self) -> bool {
        !self.name.trim().is_empty() && !self.leader_name.trim().is_empty()
    }
}
