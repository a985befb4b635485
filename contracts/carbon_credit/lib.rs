#![cfg_attr(not(feature = "std"), no_std, no_main)]

#[ink::contract]
mod carbon_credit {
    use ink::prelude::string::String;
    use ink::storage::Mapping;

    pub const TOKEN_NAME: &str = "Carbon Credit";
    pub const TOKEN_SYMBOL: &str = "CCREDIT";
    pub const TOKEN_DECIMALS: u8 = 6;
    pub const DEFAULT_TOKEN_URI: &str = "https://example.com/carbon-credit-metadata.json";

    pub const DEFAULT_ISSUANCE_FEE: Balance = 1000;
    pub const DEFAULT_MAX_ISSUERS: u32 = 100;
    pub const DEFAULT_GRACE_PERIOD: BlockNumber = 144;
    pub const DEFAULT_MAX_SUPPLY: Balance = 1_000_000_000;

    pub const MAX_GRACE_PERIOD: BlockNumber = 1440;
    pub const MAX_LOCATION_LEN: usize = 100;

    /// Credit records are keyed by the total supply right after the mint or burn
    /// that created them.
    pub type CreditId = Balance;
    pub type Result<T> = core::result::Result<T, Error>;

    /// Discriminants are the numeric codes callers match on. They double as the
    /// SCALE variant index, so the encoded error is the code itself.
    #[derive(scale::Encode, scale::Decode, Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        NotAuthorized = 100,
        InvalidAmount = 101,
        InvalidMetadata = 103,
        InsufficientBalance = 104,
        MaxSupplyExceeded = 105,
        MintPaused = 107,
        BurnPaused = 108,
        InvalidRecipient = 109,
        InvalidIssuer = 110,
        AlreadyIssued = 111,
        InvalidLocation = 114,
        InvalidProjectType = 115,
        MaxIssuersExceeded = 120,
        InvalidFee = 121,
        InvalidGracePeriod = 123,
        InvalidRetirementReason = 124,
        Overflow = 130,
    }

    impl Error {
        pub fn code(&self) -> u32 {
            *self as u32
        }
    }

    #[derive(scale::Encode, scale::Decode, Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub enum ProjectType {
        Forest,
        Renewable,
        Soil,
    }

    impl ProjectType {
        pub fn parse(kind_str: &str) -> Option<Self> {
            match kind_str {
                "forest" => Some(ProjectType::Forest),
                "renewable" => Some(ProjectType::Renewable),
                "soil" => Some(ProjectType::Soil),
                _ => None,
            }
        }
    }

    /// Issuance record written by `mint`.
    #[derive(scale::Encode, scale::Decode, Debug, Clone, PartialEq, Eq)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub struct CreditMetadata {
        pub offset_amt: Balance,
        pub created_at: BlockNumber,
        pub location_str: String,
        pub project_type: ProjectType,
        pub verifier_acc: AccountId,
        // nothing deactivates a credit yet
        pub active_flag: bool,
    }

    /// Retirement record written by `burn`.
    #[derive(scale::Encode, scale::Decode, Debug, Clone, PartialEq, Eq)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub struct CreditRetirement {
        pub reason_str: String,
        pub retired_at: BlockNumber,
        pub retiree_acc: AccountId,
    }

    /// Admin-controlled knobs of one ledger instance.
    #[derive(scale::Encode, scale::Decode, Debug, Clone, PartialEq, Eq)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub struct LedgerParams {
        pub admin_acc: AccountId,
        pub issuance_fee: Balance,
        pub max_issuers: u32,
        pub grace_period: BlockNumber,
        pub token_uri: String,
        pub mint_paused: bool,
        pub burn_paused: bool,
        pub max_supply: Balance,
    }

    impl LedgerParams {
        fn new(admin_acc: AccountId, max_supply: Balance, max_issuers: u32) -> Self {
            Self {
                admin_acc,
                issuance_fee: DEFAULT_ISSUANCE_FEE,
                max_issuers,
                grace_period: DEFAULT_GRACE_PERIOD,
                token_uri: String::from(DEFAULT_TOKEN_URI),
                mint_paused: false,
                burn_paused: false,
                max_supply,
            }
        }
    }

    /// Reserved sink address. No key pair maps to the all-zero account, so it
    /// can never be a holder, recipient or issuer.
    pub fn null_acc() -> AccountId {
        AccountId::from([0u8; 32])
    }

    #[ink(event)]
    pub struct Transferred {
        #[ink(topic)]
        from_acc: AccountId,
        #[ink(topic)]
        to_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct Approved {
        #[ink(topic)]
        owner_acc: AccountId,
        #[ink(topic)]
        spender_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct Minted {
        #[ink(topic)]
        to_acc: AccountId,
        credit_id: CreditId,
        amount_val: Balance,
    }

    /// Value transfer the runtime settles together with the mint that emitted it.
    #[ink(event)]
    pub struct IssuanceFeeCharged {
        #[ink(topic)]
        from_acc: AccountId,
        #[ink(topic)]
        to_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct Burned {
        #[ink(topic)]
        from_acc: AccountId,
        credit_id: CreditId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct IssuerSet {
        #[ink(topic)]
        issuer_acc: AccountId,
        enabled_flag: bool,
    }

    #[ink(event)]
    pub struct PausedSet {
        mint_flag: bool,
        burn_flag: bool,
    }

    #[ink(event)]
    pub struct IssuanceFeeSet {
        fee_val: Balance,
    }

    #[ink(event)]
    pub struct GracePeriodSet {
        period_val: BlockNumber,
    }

    #[ink(event)]
    pub struct TokenUriSet {
        uri_str: String,
    }

    #[ink(storage)]
    pub struct CarbonCredit {
        // governance / control
        params: LedgerParams,
        issuers: Mapping<AccountId, bool>,
        issuer_cnt: u32,

        // token state
        total_supply: Balance,
        balances: Mapping<AccountId, Balance>,
        allowances: Mapping<(AccountId, AccountId), Balance>,

        // credit registry
        credit_metadata: Mapping<CreditId, CreditMetadata>,
        credit_retirements: Mapping<CreditId, CreditRetirement>,

        // versioning (future migrations)
        storage_ver_u32: u32,
    }

    impl CarbonCredit {
        // -------- constructors --------

        #[ink(constructor)]
        pub fn new() -> Self {
            Self::with_limits(DEFAULT_MAX_SUPPLY, DEFAULT_MAX_ISSUERS)
        }

        #[ink(constructor)]
        pub fn with_limits(max_supply: Balance, max_issuers: u32) -> Self {
            Self {
                params: LedgerParams::new(Self::env().caller(), max_supply, max_issuers),
                issuers: Mapping::default(),
                issuer_cnt: 0,
                total_supply: 0,
                balances: Mapping::default(),
                allowances: Mapping::default(),
                credit_metadata: Mapping::default(),
                credit_retirements: Mapping::default(),
                storage_ver_u32: 1,
            }
        }

        // -------- modifiers (helpers) --------

        fn only_admin(&self) -> Result<()> {
            if self.env().caller() != self.params.admin_acc {
                return Err(Error::NotAuthorized)
            }
            Ok(())
        }

        fn when_mint_active(&self) -> Result<()> {
            if self.params.mint_paused {
                return Err(Error::MintPaused)
            }
            Ok(())
        }

        fn when_burn_active(&self) -> Result<()> {
            if self.params.burn_paused {
                return Err(Error::BurnPaused)
            }
            Ok(())
        }

        // -------- read API --------

        #[ink(message)]
        pub fn token_name(&self) -> String {
            String::from(TOKEN_NAME)
        }

        #[ink(message)]
        pub fn token_symbol(&self) -> String {
            String::from(TOKEN_SYMBOL)
        }

        #[ink(message)]
        pub fn token_decimals(&self) -> u8 {
            TOKEN_DECIMALS
        }

        #[ink(message)]
        pub fn token_uri(&self) -> String {
            self.params.token_uri.clone()
        }

        #[ink(message)]
        pub fn total_supply(&self) -> Balance {
            self.total_supply
        }

        #[ink(message)]
        pub fn balance_of(&self, owner_acc: AccountId) -> Balance {
            self.balances.get(&owner_acc).unwrap_or(0)
        }

        #[ink(message)]
        pub fn my_balance(&self) -> Balance {
            let caller_acc = self.env().caller();
            self.balance_of(caller_acc)
        }

        #[ink(message)]
        pub fn allowance(&self, owner_acc: AccountId, spender_acc: AccountId) -> Balance {
            self.allowances.get(&(owner_acc, spender_acc)).unwrap_or(0)
        }

        #[ink(message)]
        pub fn credit_metadata(&self, credit_id: CreditId) -> Option<CreditMetadata> {
            self.credit_metadata.get(credit_id)
        }

        #[ink(message)]
        pub fn credit_retirement(&self, credit_id: CreditId) -> Option<CreditRetirement> {
            self.credit_retirements.get(credit_id)
        }

        #[ink(message)]
        pub fn is_issuer(&self, issuer_acc: AccountId) -> bool {
            self.issuers.get(&issuer_acc).unwrap_or(false)
        }

        #[ink(message)]
        pub fn issuer_count(&self) -> u32 {
            self.issuer_cnt
        }

        #[ink(message)]
        pub fn admin(&self) -> AccountId {
            self.params.admin_acc
        }

        #[ink(message)]
        pub fn issuance_fee(&self) -> Balance {
            self.params.issuance_fee
        }

        #[ink(message)]
        pub fn max_supply(&self) -> Balance {
            self.params.max_supply
        }

        #[ink(message)]
        pub fn max_issuers(&self) -> u32 {
            self.params.max_issuers
        }

        #[ink(message)]
        pub fn grace_period(&self) -> BlockNumber {
            self.params.grace_period
        }

        #[ink(message)]
        pub fn is_mint_paused(&self) -> bool {
            self.params.mint_paused
        }

        #[ink(message)]
        pub fn is_burn_paused(&self) -> bool {
            self.params.burn_paused
        }

        #[ink(message)]
        pub fn storage_version(&self) -> u32 {
            self.storage_ver_u32
        }

        // -------- write API --------

        /// Self-service transfer: `sender_acc` has to be the caller.
        #[ink(message)]
        pub fn transfer(
            &mut self,
            amount_val: Balance,
            sender_acc: AccountId,
            recipient_acc: AccountId,
        ) -> Result<()> {
            if self.env().caller() != sender_acc {
                return Err(Error::NotAuthorized)
            }
            if amount_val == 0 {
                return Err(Error::InvalidAmount)
            }
            if recipient_acc == null_acc() {
                return Err(Error::InvalidRecipient)
            }
            self.move_balance(sender_acc, recipient_acc, amount_val)
        }

        /// Sets the allowance outright. Zero is rejected, so this cannot clear one.
        #[ink(message)]
        pub fn approve(&mut self, spender_acc: AccountId, amount_val: Balance) -> Result<()> {
            if amount_val == 0 {
                return Err(Error::InvalidAmount)
            }
            let owner_acc = self.env().caller();
            self.allowances.insert(&(owner_acc, spender_acc), &amount_val);
            self.env().emit_event(Approved { owner_acc, spender_acc, amount_val });
            Ok(())
        }

        #[ink(message)]
        pub fn transfer_from(
            &mut self,
            owner_acc: AccountId,
            recipient_acc: AccountId,
            amount_val: Balance,
        ) -> Result<()> {
            if amount_val == 0 {
                return Err(Error::InvalidAmount)
            }
            if recipient_acc == null_acc() {
                return Err(Error::InvalidRecipient)
            }

            let spender_acc = self.env().caller();
            let current_allow = self.allowance(owner_acc, spender_acc);
            if current_allow < amount_val {
                return Err(Error::NotAuthorized)
            }

            // Balance check happens in move_balance before anything is written
            self.move_balance(owner_acc, recipient_acc, amount_val)?;

            let new_allow = current_allow - amount_val;
            self.allowances.insert(&(owner_acc, spender_acc), &new_allow);
            self.env().emit_event(Approved { owner_acc, spender_acc, amount_val: new_allow });
            Ok(())
        }

        /// Issues `amount_val` credits to `recipient_acc` and registers the
        /// offset behind them under the resulting total supply.
        ///
        /// Also schedules the issuance fee from the caller to the admin. Only the
        /// admin may mint, so payer and payee are the same account.
        #[ink(message)]
        pub fn mint(
            &mut self,
            amount_val: Balance,
            recipient_acc: AccountId,
            offset_amt: Balance,
            location_str: String,
            project_type: String,
            verifier_acc: AccountId,
        ) -> Result<()> {
            self.only_admin()?;
            self.when_mint_active()?;
            if amount_val == 0 {
                return Err(Error::InvalidAmount)
            }
            if recipient_acc == null_acc() {
                return Err(Error::InvalidRecipient)
            }
            if offset_amt == 0 || location_str.is_empty() || project_type.is_empty() {
                return Err(Error::InvalidMetadata)
            }
            let project_kind =
                ProjectType::parse(&project_type).ok_or(Error::InvalidProjectType)?;
            if location_str.chars().count() > MAX_LOCATION_LEN {
                return Err(Error::InvalidLocation)
            }
            let new_total = self
                .total_supply
                .checked_add(amount_val)
                .ok_or(Error::MaxSupplyExceeded)?;
            if new_total > self.params.max_supply {
                return Err(Error::MaxSupplyExceeded)
            }
            let to_bal = self.balance_of(recipient_acc);
            let new_to = to_bal.checked_add(amount_val).ok_or(Error::Overflow)?;

            self.balances.insert(&recipient_acc, &new_to);
            self.total_supply = new_total;

            // A burn can bring the supply back to an earlier value, in which
            // case this replaces the record stored under that id.
            let credit_id = new_total;
            let created_at = self.env().block_number();
            self.credit_metadata.insert(
                credit_id,
                &CreditMetadata {
                    offset_amt,
                    created_at,
                    location_str,
                    project_type: project_kind,
                    verifier_acc,
                    active_flag: true,
                },
            );
            self.env().emit_event(Minted { to_acc: recipient_acc, credit_id, amount_val });

            self.env().emit_event(IssuanceFeeCharged {
                from_acc: self.env().caller(),
                to_acc: self.params.admin_acc,
                amount_val: self.params.issuance_fee,
            });
            Ok(())
        }

        /// Retires credits from the caller's own balance.
        #[ink(message)]
        pub fn burn(&mut self, amount_val: Balance, reason_str: String) -> Result<()> {
            self.when_burn_active()?;
            if amount_val == 0 {
                return Err(Error::InvalidAmount)
            }
            if reason_str.is_empty() {
                return Err(Error::InvalidRetirementReason)
            }
            let from_acc = self.env().caller();
            let from_bal = self.balance_of(from_acc);
            if from_bal < amount_val {
                return Err(Error::InsufficientBalance)
            }
            let new_from = from_bal - amount_val;
            let new_total = self.total_supply.checked_sub(amount_val).ok_or(Error::Overflow)?;

            self.balances.insert(&from_acc, &new_from);
            self.total_supply = new_total;

            let credit_id = new_total;
            let retired_at = self.env().block_number();
            self.credit_retirements.insert(
                credit_id,
                &CreditRetirement { reason_str, retired_at, retiree_acc: from_acc },
            );
            self.env().emit_event(Burned { from_acc, credit_id, amount_val });
            Ok(())
        }

        // -------- admin / roles --------

        #[ink(message)]
        pub fn add_issuer(&mut self, issuer_acc: AccountId) -> Result<()> {
            self.only_admin()?;
            if issuer_acc == null_acc() {
                return Err(Error::InvalidRecipient)
            }
            if self.is_issuer(issuer_acc) {
                return Err(Error::AlreadyIssued)
            }
            if self.issuer_cnt >= self.params.max_issuers {
                return Err(Error::MaxIssuersExceeded)
            }
            let new_cnt = self.issuer_cnt.checked_add(1).ok_or(Error::Overflow)?;
            self.issuers.insert(&issuer_acc, &true);
            self.issuer_cnt = new_cnt;
            self.env().emit_event(IssuerSet { issuer_acc, enabled_flag: true });
            Ok(())
        }

        #[ink(message)]
        pub fn remove_issuer(&mut self, issuer_acc: AccountId) -> Result<()> {
            self.only_admin()?;
            if !self.is_issuer(issuer_acc) {
                return Err(Error::InvalidIssuer)
            }
            let new_cnt = self.issuer_cnt.checked_sub(1).ok_or(Error::Overflow)?;
            self.issuers.remove(&issuer_acc);
            self.issuer_cnt = new_cnt;
            self.env().emit_event(IssuerSet { issuer_acc, enabled_flag: false });
            Ok(())
        }

        #[ink(message)]
        pub fn set_issuance_fee(&mut self, fee_val: Balance) -> Result<()> {
            self.only_admin()?;
            if fee_val == 0 {
                return Err(Error::InvalidFee)
            }
            self.params.issuance_fee = fee_val;
            self.env().emit_event(IssuanceFeeSet { fee_val });
            Ok(())
        }

        #[ink(message)]
        pub fn pause_mint(&mut self) -> Result<()> {
            self.set_pause_flags(true, self.params.burn_paused)
        }

        #[ink(message)]
        pub fn unpause_mint(&mut self) -> Result<()> {
            self.set_pause_flags(false, self.params.burn_paused)
        }

        #[ink(message)]
        pub fn pause_burn(&mut self) -> Result<()> {
            self.set_pause_flags(self.params.mint_paused, true)
        }

        #[ink(message)]
        pub fn unpause_burn(&mut self) -> Result<()> {
            self.set_pause_flags(self.params.mint_paused, false)
        }

        #[ink(message)]
        pub fn set_token_uri(&mut self, uri_str: String) -> Result<()> {
            self.only_admin()?;
            self.params.token_uri = uri_str;
            self.env().emit_event(TokenUriSet { uri_str: self.params.token_uri.clone() });
            Ok(())
        }

        /// Stored for off-chain verifiers; nothing in the ledger enforces it.
        #[ink(message)]
        pub fn set_grace_period(&mut self, period_val: BlockNumber) -> Result<()> {
            self.only_admin()?;
            if period_val > MAX_GRACE_PERIOD {
                return Err(Error::InvalidGracePeriod)
            }
            self.params.grace_period = period_val;
            self.env().emit_event(GracePeriodSet { period_val });
            Ok(())
        }

        // ---- internals ----

        fn set_pause_flags(&mut self, mint_flag: bool, burn_flag: bool) -> Result<()> {
            self.only_admin()?;
            self.params.mint_paused = mint_flag;
            self.params.burn_paused = burn_flag;
            self.env().emit_event(PausedSet { mint_flag, burn_flag });
            Ok(())
        }

        fn move_balance(&mut self, from_acc: AccountId, to_acc: AccountId, amount_val: Balance) -> Result<()> {
            let from_bal = self.balance_of(from_acc);
            if from_bal < amount_val {
                return Err(Error::InsufficientBalance)
            }
            if from_acc != to_acc {
                let new_from = from_bal - amount_val;
                let new_to = self
                    .balance_of(to_acc)
                    .checked_add(amount_val)
                    .ok_or(Error::Overflow)?;
                self.balances.insert(&from_acc, &new_from);
                self.balances.insert(&to_acc, &new_to);
            }
            self.env().emit_event(Transferred { from_acc, to_acc, amount_val });
            Ok(())
        }
    }


    #[cfg(all(test, feature = "e2e-tests"))]
    mod e2e_tests {
        use super::*;
        use ink_e2e::ContractsBackend;

        type E2EResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

        #[ink_e2e::test]
        async fn e2e_mint_then_read_back<Client: E2EBackend>(mut client: Client) -> E2EResult<()> {
            let mut constructor = CarbonCreditRef::new();
            let contract = client
                .instantiate("carbon_credit", &ink_e2e::alice(), &mut constructor)
                .submit()
                .await
                .expect("instantiate failed");
            let mut call_builder = contract.call_builder::<CarbonCredit>();

            let holder_acc = AccountId::from([0x07; 32]);
            let mint = call_builder.mint(
                1000,
                holder_acc,
                1000,
                String::from("ForestA"),
                String::from("forest"),
                holder_acc,
            );
            client
                .call(&ink_e2e::alice(), &mint)
                .submit()
                .await
                .expect("mint failed");

            let balance_of = call_builder.balance_of(holder_acc);
            let balance_res = client.call(&ink_e2e::alice(), &balance_of).dry_run().await?;
            assert_eq!(balance_res.return_value(), 1000);

            let total_supply = call_builder.total_supply();
            let supply_res = client.call(&ink_e2e::alice(), &total_supply).dry_run().await?;
            assert_eq!(supply_res.return_value(), 1000);
            Ok(())
        }
    }
}
