use super::{ShareRequestRecord, ShareRequestRow, ShareStatusRecord, ShareStatusRow, UnknownVariant};

impl TryFrom<ShareRequestRow> for ShareRequestRecord {
    type Error = UnknownVariant;

    fn try_from(row: ShareRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            credential_type: row.credential_type.parse()?,
            recipient_name: row.recipient_name,
            recipient_email: row.recipient_email,
            institution_id: row.institution_id,
            institution_name: row.institution_name,
            issued_to: row.issued_to,
            presigned_url: row.presigned_url,
            fingerprint: row.fingerprint,
            share_token: row.share_token,
            token_expires_at: row.token_expires_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ShareStatusRow> for ShareStatusRecord {
    type Error = UnknownVariant;

    fn try_from(row: ShareStatusRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            share_id: row.share_id,
            status: row.status.parse()?,
            updated_at: row.updated_at,
            detail: row.detail,
        })
    }
}
