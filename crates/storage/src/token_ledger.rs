use crate::StorageError;
use anyhow::Result;
use sled::transaction::{abort, ConflictableTransactionResult, TransactionError, TransactionalTree};
use sled::{Db, Tree};
use tap_treasury::{TokenLedger, Transfer, TransferError};
use tap_types::{AccountId, Amount};
use tracing::debug;

const KEY_SYMBOL: &[u8] = b"symbol";

/// Reward token balances kept in the node's own database.
///
/// Balances are stored as 16-byte big-endian values keyed by account id.
/// Every transfer batch runs in a single sled transaction, so either all of
/// its transfers land or none do. Clones share the same trees.
#[derive(Clone)]
pub struct SledTokenLedger {
    accounts: Tree,
    metadata: Tree,
    treasury: AccountId,
}

fn encode_balance(amount: Amount) -> [u8; 16] {
    amount.to_be_bytes()
}

fn decode_balance(account: &str, raw: &[u8]) -> Result<Amount, StorageError> {
    let bytes: [u8; 16] = raw
        .try_into()
        .map_err(|_| StorageError::CorruptBalance(account.to_string()))?;
    Ok(Amount::from_be_bytes(bytes))
}

impl SledTokenLedger {
    /// Open the ledger trees in `db`. The symbol is recorded on first open and
    /// kept afterwards.
    pub fn open(db: &Db, treasury: AccountId, symbol: &str) -> Result<Self> {
        let accounts = db.open_tree("token_accounts")?;
        let metadata = db.open_tree("token_metadata")?;
        if metadata.get(KEY_SYMBOL)?.is_none() {
            metadata.insert(KEY_SYMBOL, symbol.as_bytes())?;
        }
        Ok(Self {
            accounts,
            metadata,
            treasury,
        })
    }

    pub fn treasury(&self) -> &AccountId {
        &self.treasury
    }

    pub fn balance(&self, account: &AccountId) -> Result<Amount> {
        match self.accounts.get(account.as_str())? {
            Some(raw) => Ok(decode_balance(account.as_str(), &raw)?),
            None => Ok(0),
        }
    }

    /// Mint `amount` into `account`, returning the new balance.
    pub fn credit(&self, account: &AccountId, amount: Amount) -> Result<Amount> {
        let current = self.balance(account)?;
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("balance of {} would overflow", account))?;
        self.accounts
            .insert(account.as_str(), &encode_balance(updated)[..])?;
        self.accounts.flush()?;
        Ok(updated)
    }

    /// Burn `amount` from `account`, returning the new balance.
    pub fn debit(&self, account: &AccountId, amount: Amount) -> Result<Amount> {
        let current = self.balance(account)?;
        let updated = current.checked_sub(amount).ok_or_else(|| {
            anyhow::anyhow!("{} holds {}, cannot debit {}", account, current, amount)
        })?;
        self.accounts
            .insert(account.as_str(), &encode_balance(updated)[..])?;
        self.accounts.flush()?;
        Ok(updated)
    }

    fn apply(
        tx: &TransactionalTree,
        treasury: &AccountId,
        batch: &[Transfer],
    ) -> ConflictableTransactionResult<(), TransferError> {
        let read = |account: &AccountId| -> ConflictableTransactionResult<Amount, TransferError> {
            match tx.get(account.as_str())? {
                Some(raw) => match decode_balance(account.as_str(), &raw) {
                    Ok(balance) => Ok(balance),
                    Err(e) => abort(TransferError::Unavailable(e.to_string())),
                },
                None => Ok(0),
            }
        };

        for transfer in batch {
            let available = read(treasury)?;
            if available < transfer.amount {
                return abort(TransferError::InsufficientFunds {
                    needed: transfer.amount,
                    available,
                });
            }
            tx.insert(
                treasury.as_str(),
                &encode_balance(available - transfer.amount)[..],
            )?;

            let received = read(&transfer.to)?;
            let Some(updated) = received.checked_add(transfer.amount) else {
                return abort(TransferError::Rejected(transfer.to.clone()));
            };
            tx.insert(transfer.to.as_str(), &encode_balance(updated)[..])?;
        }
        Ok(())
    }
}

impl TokenLedger for SledTokenLedger {
    fn symbol(&self) -> Result<String> {
        let raw = self
            .metadata
            .get(KEY_SYMBOL)?
            .ok_or_else(|| anyhow::anyhow!("token symbol not recorded"))?;
        Ok(String::from_utf8(raw.to_vec())?)
    }

    fn balance_of(&self, owner: &AccountId) -> Result<Amount> {
        self.balance(owner)
    }

    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.transfer_all(&[Transfer {
            to: to.clone(),
            amount,
        }])
    }

    fn transfer_all(&mut self, batch: &[Transfer]) -> Result<(), TransferError> {
        let treasury = &self.treasury;
        self.accounts
            .transaction(|tx| Self::apply(tx, treasury, batch))
            .map_err(|e| match e {
                TransactionError::Abort(reason) => reason,
                TransactionError::Storage(err) => TransferError::Unavailable(err.to_string()),
            })?;
        self.accounts
            .flush()
            .map_err(|e| TransferError::Unavailable(e.to_string()))?;
        debug!(target: "storage", transfers = batch.len(), "token batch committed");
        Ok(())
    }
}
