use rusqlite::{params, OptionalExtension};

use super::{lock, SharedConnection};
use crate::models::VillageInfo;
use crate::utils::date::timestamp_now;
use crate::utils::error::AppResult;

pub struct VillageRepository {
    conn: SharedConnection,
}

impl VillageRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Fetch village identity (creates the empty row if missing)
    pub fn get(&self) -> AppResult<VillageInfo> {
        let conn = lock(&self.conn)?;

        let existing = conn
            .query_row(
                "SELECT id, name, district, regency, province, address, postal_code,
                        leader_name, leader_title, phone, email, logo_path, signature_path,
                        created_at, updated_at
                 FROM village_info WHERE id = 1",
                [],
                |row| {
                    Ok(VillageInfo {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        district: row.get(2)?,
                        regency: row.get(3)?,
                        province: row.get(4)?,
                        address: row.get(5)?,
                        postal_code: row.get(6)?,
                        leader_name: row.get(7)?,
                        leader_title: row.get(8)?,
                        phone: row.get(9)?,
                        email: row.get(10)?,
                        logo_path: row.get(11)?,
                        signature_path: row.get(12)?,
                        created_at: row.get(13)?,
                        updated_at: row.get(14)?,
                    })
                },
            )
            .optional()?;

        match existing {
            Some(info) => Ok(info),
            None => {
                drop(conn);
                let mut info = VillageInfo::default();
                self.save(&mut info)?;
                Ok(info)
            }
        }
    }

    /// Save village identity, keeping the original creation time
    pub fn save(&self, info: &mut VillageInfo) -> AppResult<()> {
        let now = timestamp_now();
        info.id = 1;
        if info.created_at.is_none() {
            info.created_at = Some(now.clone());
        }
        info.updated_at = Some(now);

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO village_info (
                id, name, district, regency, province, address, postal_code,
                leader_name, leader_title, phone, email, logo_path, signature_path,
                created_at, updated_at
             ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                district = excluded.district,
                regency = excluded.regency,
                province = excluded.province,
                address = excluded.address,
                postal_code = excluded.postal_code,
                leader_name = excluded.leader_name,
                leader_title = excluded.leader_title,
                phone = excluded.phone,
                email = excluded.email,
                logo_path = excluded.logo_path,
                signature_path = excluded.signature_path,
                updated_at = excluded.updated_at",
            params![
                info.name.trim(),
                info.district.trim(),
                info.regency.trim(),
                info.province.trim(),
                info.address.trim(),
                info.postal_code.trim(),
                info.leader_name.trim(),
                info.leader_title.trim(),
                info.phone.trim(),
                info.email.trim(),
                info.logo_path,
                info.signature_path,
                info.created_at,
                info.updated_at,
            ],
        )?;

        Ok(())
    }
}
