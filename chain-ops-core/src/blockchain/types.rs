use codec::Decode;

/// `frame_system::AccountInfo` as stored under `System.Account`
#[derive(Debug, Decode)]
pub(crate) struct AccountInfo {
    pub nonce: u32,
    pub _consumers: u32,
    pub _providers: u32,
    pub _sufficients: u32,
    pub data: AccountData,
}

#[derive(Debug, Decode)]
pub(crate) struct AccountData {
    pub free: u128,
    pub reserved: u128,
    pub _frozen: u128,
    pub _flags: u128,
}

/// `Staking.ActiveEra`
#[derive(Debug, Decode)]
pub(crate) struct ActiveEraInfo {
    pub _index: u32,
    /// Milliseconds since the unix epoch
    pub start: Option<u64>,
}
