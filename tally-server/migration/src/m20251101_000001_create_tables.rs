use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk(User::Id))
                    .col(ColumnDef::new(User::Username).string_len(64).not_null().unique_key())
                    .col(ColumnDef::new(User::PasswordHash).string_len(160).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Attendance::Table)
                    .if_not_exists()
                    .col(pk(Attendance::Id))
                    .col(ColumnDef::new(Attendance::ServiceDate).date().not_null())
                    .col(ColumnDef::new(Attendance::ServiceType).string_len(20).not_null())
                    .col(big_count(Attendance::AdultsMen))
                    .col(big_count(Attendance::AdultsWomen))
                    .col(big_count(Attendance::YouthGents))
                    .col(big_count(Attendance::YouthLadies))
                    .col(big_count(Attendance::ChildrenBoys))
                    .col(big_count(Attendance::ChildrenGirls))
                    .col(big_count(Attendance::VisitorsMale))
                    .col(big_count(Attendance::VisitorsFemale))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attendance_day")
                    .table(Attendance::Table)
                    .col(Attendance::ServiceDate)
                    .col(Attendance::ServiceType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Offering::Table)
                    .if_not_exists()
                    .col(pk(Offering::Id))
                    .col(ColumnDef::new(Offering::ServiceDate).date().not_null())
                    .col(ColumnDef::new(Offering::ServiceType).string_len(20).not_null())
                    .col(amount(Offering::FirstOffering))
                    .col(amount(Offering::SecondOffering))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_offering_day")
                    .table(Offering::Table)
                    .col(Offering::ServiceDate)
                    .col(Offering::ServiceType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Member::Table)
                    .if_not_exists()
                    .col(pk(Member::Id))
                    .col(ColumnDef::new(Member::MemberId).string_len(36).not_null().unique_key())
                    .col(ColumnDef::new(Member::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Member::Gender).string_len(10).not_null())
                    .col(ColumnDef::new(Member::AgeGroup).string_len(20).not_null())
                    .col(ColumnDef::new(Member::Contact).string_len(50).null())
                    .col(ColumnDef::new(Member::JoinDate).date().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Fund::Table)
                    .if_not_exists()
                    .col(pk(Fund::Id))
                    .col(ColumnDef::new(Fund::Name).string_len(100).not_null().unique_key())
                    .col(ColumnDef::new(Fund::Description).text().null())
                    .col(ColumnDef::new(Fund::CreatedDate).date().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contribution::Table)
                    .if_not_exists()
                    .col(pk(Contribution::Id))
                    .col(ColumnDef::new(Contribution::FundId).integer().not_null())
                    .col(ColumnDef::new(Contribution::ServiceDate).date().not_null())
                    .col(ColumnDef::new(Contribution::ServiceType).string_len(20).not_null())
                    .col(ColumnDef::new(Contribution::Amount).double().not_null())
                    .col(ColumnDef::new(Contribution::MemberId).integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contribution_fund")
                            .from(Contribution::Table, Contribution::FundId)
                            .to(Fund::Table, Fund::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contribution_member")
                            .from(Contribution::Table, Contribution::MemberId)
                            .to(Member::Table, Member::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MonthlyBudget::Table)
                    .if_not_exists()
                    .col(pk(MonthlyBudget::Id))
                    .col(ColumnDef::new(MonthlyBudget::MonthYear).string_len(7).not_null())
                    .col(ColumnDef::new(MonthlyBudget::ServiceType).string_len(20).not_null())
                    .col(count(MonthlyBudget::TargetAttendance))
                    .col(amount(MonthlyBudget::TargetOffering))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_budget_month")
                    .table(MonthlyBudget::Table)
                    .col(MonthlyBudget::MonthYear)
                    .col(MonthlyBudget::ServiceType)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contribution::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MonthlyBudget::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Fund::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Member::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Offering::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attendance::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

fn pk<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn count<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).integer().not_null().default(0).to_owned()
}

fn big_count<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).big_integer().not_null().default(0).to_owned()
}

fn amount<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).double().not_null().default(0.0).to_owned()
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    PasswordHash,
}

#[derive(DeriveIden)]
enum Attendance {
    Table,
    Id,
    ServiceDate,
    ServiceType,
    AdultsMen,
    AdultsWomen,
    YouthGents,
    YouthLadies,
    ChildrenBoys,
    ChildrenGirls,
    VisitorsMale,
    VisitorsFemale,
}

#[derive(DeriveIden)]
enum Offering {
    Table,
    Id,
    ServiceDate,
    ServiceType,
    FirstOffering,
    SecondOffering,
}

#[derive(DeriveIden)]
enum Member {
    Table,
    Id,
    MemberId,
    Name,
    Gender,
    AgeGroup,
    Contact,
    JoinDate,
}

#[derive(DeriveIden)]
enum Fund {
    Table,
    Id,
    Name,
    Description,
    CreatedDate,
}

#[derive(DeriveIden)]
enum Contribution {
    Table,
    Id,
    FundId,
    ServiceDate,
    ServiceType,
    Amount,
    MemberId,
}

#[derive(DeriveIden)]
enum MonthlyBudget {
    Table,
    Id,
    MonthYear,
    ServiceType,
    TargetAttendance,
    TargetOffering,
}
